//! 駆動ポート（外部から呼び出されるユースケースの入口）
//!
//! 外部システム（UI、CLI）が呼び出すユースケースを定義する。
//! アプリケーション層のサービスが実装する。

mod machine_id_use_case;

pub use machine_id_use_case::*;
