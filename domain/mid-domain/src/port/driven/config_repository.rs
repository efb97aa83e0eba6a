//! 設定リポジトリポート

use crate::error::DomainError;
use crate::model::MachineIdConfig;

/// 設定ストレージポート
pub trait ConfigRepository: Send + Sync {
    /// 設定を読込（未保存なら既定値）
    fn load(&self) -> Result<MachineIdConfig, DomainError>;

    /// 設定を保存
    fn save(&self, config: &MachineIdConfig) -> Result<(), DomainError>;

    /// 設定ファイルの存在確認
    fn exists(&self) -> bool;
}
