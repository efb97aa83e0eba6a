//! mid-engine: 原本バックアップ／変更履歴の台帳と、識別子変更の
//! ワークフローを実装する層。ドメイン（mid-domain）のポートにのみ依存する。

pub mod ledger;
pub mod mutation;

pub use ledger::{Ledger, LedgerDeps};
pub use mutation::{MutationDeps, MutationEngine};

#[cfg(test)]
mod test_support;
