//! ポート定義（ヘキサゴナルアーキテクチャ）
//!
//! - driving: 外部から呼ばれるユースケース
//! - driven: ドメインが外部に求める機能

pub mod driven;
pub mod driving;
