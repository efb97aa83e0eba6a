//! アカウントストア参照ポート

use crate::model::{AccountId, AccountSummary};

/// 外部アカウントストアの参照（本体は管理しない）
pub trait AccountDirectory: Send + Sync {
    fn lookup_account(&self, id: &AccountId) -> Option<AccountSummary>;
}
