//! ドメインエラー型
//!
//! 各バリアントは呼び出し側が区別して扱うべき失敗種別に対応する。

use thiserror::Error;

/// 表示層が分岐に使う安定したエラー種別コード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Access,
    Permission,
    Validation,
    Persistence,
    NoBackup,
    Launch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "AccessError",
            Self::Permission => "PermissionError",
            Self::Validation => "ValidationError",
            Self::Persistence => "PersistenceError",
            Self::NoBackup => "NoBackupError",
            Self::Launch => "LaunchError",
        }
    }
}

/// ドメイン層のエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 識別子ストアが読めない／存在しない（破損したパス、キー欠落など）
    #[error("Machine identifier store is not accessible: {0}")]
    Access(String),

    /// 権限不足で書き込みが拒否された（昇格で回復可能）
    #[error("Administrator privileges are required: {0}. Restart as administrator (or root) and retry")]
    Permission(String),

    /// 識別子やアカウントIDの形式が不正
    #[error("Invalid machine identifier: {0}")]
    Validation(String),

    /// 履歴／バックアップ／バインディングの永続化失敗
    #[error("Failed to persist machine identifier state: {0}")]
    Persistence(String),

    /// バックアップが一度も作成されていない状態で復元を要求した
    #[error("No original machine identifier backup exists; nothing to restore")]
    NoBackup,

    /// 昇格した再起動プロセスを起動できなかった
    #[error("Failed to relaunch with elevated privileges: {0}. Please restart the application manually as administrator")]
    Launch(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Access(_) => ErrorKind::Access,
            Self::Permission(_) => ErrorKind::Permission,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::NoBackup => ErrorKind::NoBackup,
            Self::Launch(_) => ErrorKind::Launch,
        }
    }

    /// 昇格すれば解消する失敗か
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_))
    }
}
