//! ドメインモデル
//!
//! 値オブジェクト、エンティティ、設定型を定義

mod binding; // アカウントと機械識別子の対応付け
mod config; // 自動切替・バインディング設定
mod history; // 原本バックアップと変更履歴
mod machine_id; // 機械識別子・アカウントID
mod os_type; // 実行プラットフォーム種別
mod outcome; // 変更・昇格・インポートの結果型

pub use binding::*;
pub use config::*;
pub use history::*;
pub use machine_id::*;
pub use os_type::*;
pub use outcome::*;
