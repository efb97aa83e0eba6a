//! Linux: `/etc/machine-id` の読み書き

use mid_adapter_fs::write_atomic;
use mid_domain::DomainError;
use mid_domain::model::MachineId;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::info;

const SYSTEM_MACHINE_ID: &str = "/etc/machine-id";

/// 書き込み権限の判定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeCheck {
    /// 実効 UID が 0 か
    EffectiveUid,
    /// 固定値（テスト・コンテナ用）
    Assume(bool),
}

#[derive(Debug)]
pub struct LinuxMachineIdFile {
    path: PathBuf,
    privilege: PrivilegeCheck,
}

impl LinuxMachineIdFile {
    pub fn system() -> Self {
        Self::at(SYSTEM_MACHINE_ID, PrivilegeCheck::EffectiveUid)
    }

    pub fn at(path: impl Into<PathBuf>, privilege: PrivilegeCheck) -> Self {
        Self {
            path: path.into(),
            privilege,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<MachineId, DomainError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| DomainError::Access(format!("read {}: {e}", self.path.display())))?;
        let value = raw.trim();
        if value.is_empty() {
            return Err(DomainError::Access(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(MachineId::from_raw(value))
    }

    /// 値をそのまま1行で書き込む。既存ファイルのパーミッションは引き継ぐ
    pub fn write(&self, id: &MachineId) -> Result<(), DomainError> {
        let previous = fs::metadata(&self.path).ok().map(|m| m.permissions());
        write_atomic(&self.path, format!("{}\n", id.as_str()).as_bytes())
            .map_err(|e| self.map_write_error(e))?;
        if let Some(permissions) = previous {
            fs::set_permissions(&self.path, permissions)
                .map_err(|e| self.map_write_error(e))?;
        }
        info!(path = %self.path.display(), "machine-id file replaced");
        Ok(())
    }

    pub fn is_privileged(&self) -> bool {
        match self.privilege {
            PrivilegeCheck::Assume(value) => value,
            PrivilegeCheck::EffectiveUid => effective_uid_is_root(),
        }
    }

    fn map_write_error(&self, e: io::Error) -> DomainError {
        let context = format!("write {}: {e}", self.path.display());
        if e.kind() == ErrorKind::PermissionDenied {
            DomainError::Permission(context)
        } else {
            DomainError::Access(context)
        }
    }
}

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}
