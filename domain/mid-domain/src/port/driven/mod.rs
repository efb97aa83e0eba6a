//! 駆動ポート（出力インターフェース）。
//!
//! ドメインが外部に求める機能を定義する。
//! インフラ層のアダプタが実装する。
//! エンジンは複数スレッドから呼ばれるため、全ポートは `Send + Sync` を要求する。

mod account_directory;
mod backup_store;
mod binding_repository;
mod clock;
mod config_repository;
mod elevation_launcher;
mod history_store;
mod id_generator;
mod machine_id_accessor;
mod machine_id_file;

pub use account_directory::*;
pub use backup_store::*;
pub use binding_repository::*;
pub use clock::*;
pub use config_repository::*;
pub use elevation_launcher::*;
pub use history_store::*;
pub use id_generator::*;
pub use machine_id_accessor::*;
pub use machine_id_file::*;
