//! ログユーティリティ
//!
//! - 診断ログ: `tracing` の購読者を標準エラーへ
//! - ライフサイクルログ: `[時刻] [コンポーネント] メッセージ` 形式の追記ファイル

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// フィルタを上書きする環境変数
pub const LOG_ENV: &str = "MID_LOG";

/// ライフサイクルログのファイル名
pub const LIFECYCLE_LOG_FILE: &str = "mid-lifecycle.log";

/// `-v` の回数から既定のフィルタ指定を決める
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// 標準エラーへの tracing 購読者を設定する。二度目以降の呼び出しは無視される
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// UTCのRFC3339（ミリ秒付き）。例: 2025-01-15T10:30:00.123Z
pub fn utc_rfc3339_millis() -> String {
    format_rfc3339_millis(Utc::now())
}

fn format_rfc3339_millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// UTCタイムスタンプ付きのライフサイクル行を作成する。
pub fn lifecycle_line(component: &str, message: &str) -> String {
    format!("[{}] [{}] {}\n", utc_rfc3339_millis(), component, message)
}

/// データディレクトリ配下のライフサイクルログ
pub fn lifecycle_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join(LIFECYCLE_LOG_FILE)
}

/// 指定された出力先のうち、書き込み可能な最初の場所にログを書き込む
pub fn write_line_to_paths(line: &str, paths: &[PathBuf]) {
    for path in paths {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
            return;
        }
    }
}

/// データディレクトリ（不可なら一時ディレクトリ）にライフサイクル行を書き込む
pub fn write_lifecycle_line(data_dir: &Path, component: &str, message: &str) {
    let line = lifecycle_line(component, message);
    let paths = [
        lifecycle_log_path(data_dir),
        std::env::temp_dir().join(LIFECYCLE_LOG_FILE),
    ];
    write_line_to_paths(&line, &paths);
}
