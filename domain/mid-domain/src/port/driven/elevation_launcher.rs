//! 昇格再起動ポート

use crate::error::DomainError;
use crate::model::ElevatedLaunch;

/// 管理者権限でのプロセス再起動
///
/// OS の昇格プロンプト自体が同意ゲート。ユーザー操作なしに呼んではならない。
/// プロンプトのキャンセルは `DomainError::Permission`、起動失敗は `DomainError::Launch`。
pub trait ElevationLauncher: Send + Sync {
    fn relaunch_elevated(&self, args: &[String]) -> Result<ElevatedLaunch, DomainError>;
}
