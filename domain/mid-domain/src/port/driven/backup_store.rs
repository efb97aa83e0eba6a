//! 原本バックアップストアポート

use crate::error::DomainError;
use crate::model::OriginalBackup;

/// 原本バックアップの永続化
pub trait BackupStore: Send + Sync {
    /// バックアップを読込（未作成なら None）
    fn load_backup(&self) -> Result<Option<OriginalBackup>, DomainError>;

    /// バックアップを保存
    fn save_backup(&self, backup: &OriginalBackup) -> Result<(), DomainError>;
}
