//! mid-composition: 実行ファイル向けのランタイムを組み立てるコンポジションルート。
//! ドメイン／アプリケーション／各種アダプタをここで配線し、apps/* はこのクレートだけに依存する。

pub mod cli;
pub mod error;
pub mod present;

// apps/* が内側レイヤーの型に触れる必要がある場合は、ここから辿れるようにする。
pub use mid_app as app;
pub use mid_domain as domain;
pub use mid_adapter_paths as paths;
pub use mid_log_utils as log_utils;
