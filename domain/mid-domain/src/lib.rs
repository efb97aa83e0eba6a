//! MachineIdKeeper ドメイン層
//!
//! 機械識別子管理の中核モデルとポートを定義する。
//! ヘキサゴナルアーキテクチャの最内層。エラー定義のための thiserror 以外に外部依存なし。

pub mod error; // ドメインエラー定義
pub mod model; // 値オブジェクト、エンティティ
pub mod port; // ポート（driving/driven）

pub use error::{DomainError, ErrorKind}; // エラー型を再エクスポート
