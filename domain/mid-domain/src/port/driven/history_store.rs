//! 変更履歴ストアポート

use crate::error::DomainError;
use crate::model::HistoryEntry;

/// 追記専用の変更履歴
pub trait HistoryStore: Send + Sync {
    /// エントリを末尾に追記
    fn append(&self, entry: &HistoryEntry) -> Result<(), DomainError>;

    /// 全エントリを古い順に列挙
    fn list(&self) -> Result<Vec<HistoryEntry>, DomainError>;

    /// 全エントリを削除
    fn clear(&self) -> Result<(), DomainError>;
}
