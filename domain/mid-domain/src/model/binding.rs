use super::{AccountId, MachineId};
use std::collections::BTreeMap;

/// アカウント → 機械識別子の対応表
pub type AccountBindings = BTreeMap<AccountId, MachineId>;

/// アカウントストアから得られるアカウント概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub email: Option<String>,
}

/// 表示用のバインディング行（アカウント情報を結合済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingView {
    pub account_id: AccountId,
    /// アカウントストアに存在しなければ None
    pub email: Option<String>,
    pub machine_id: MachineId,
}

impl BindingView {
    /// メールアドレスがあればそれを、なければアカウントIDを表示名とする
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(self.account_id.as_str())
    }
}
