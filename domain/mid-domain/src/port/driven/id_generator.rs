//! 識別子生成ポート

use crate::model::MachineId;

/// 乱数ベースの識別子生成（アダプタ実装）
pub trait IdGenerator: Send + Sync {
    /// 正準形式のランダム UUID を新しい機械識別子として返す
    fn new_machine_id(&self) -> MachineId;

    /// 履歴エントリ用の一意なID
    fn new_entry_id(&self) -> String;
}
