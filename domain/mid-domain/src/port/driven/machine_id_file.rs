//! 識別子のエクスポート／インポート用ファイルポート

use crate::error::DomainError;
use std::path::Path;

/// 外部で選択されたパスへのプレーンテキスト入出力
pub trait MachineIdFile: Send + Sync {
    fn write_text(&self, path: &Path, text: &str) -> Result<(), DomainError>;

    fn read_text(&self, path: &Path) -> Result<String, DomainError>;
}
