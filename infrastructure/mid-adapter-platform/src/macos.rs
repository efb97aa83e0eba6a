//! macOS: ハードウェア UUID には触れず、アプリ管理の上書き値を使う

use mid_adapter_fs::write_atomic;
use mid_domain::DomainError;
use mid_domain::model::MachineId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug)]
pub struct MacOverride {
    override_path: PathBuf,
}

impl MacOverride {
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            override_path: data_dir.join("state").join("machine-id.override"),
        }
    }

    /// 上書き値があればそれを、なければハードウェア UUID を返す
    pub fn read(&self) -> Result<MachineId, DomainError> {
        match fs::read_to_string(&self.override_path) {
            Ok(raw) if !raw.trim().is_empty() => Ok(MachineId::from_raw(raw.trim())),
            Ok(_) => hardware_uuid(),
            Err(e) if e.kind() == ErrorKind::NotFound => hardware_uuid(),
            Err(e) => Err(DomainError::Access(format!(
                "read {}: {e}",
                self.override_path.display()
            ))),
        }
    }

    pub fn write(&self, id: &MachineId) -> Result<(), DomainError> {
        write_atomic(&self.override_path, id.as_str().as_bytes()).map_err(|e| {
            DomainError::Access(format!("write {}: {e}", self.override_path.display()))
        })
    }
}

fn hardware_uuid() -> Result<MachineId, DomainError> {
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .map_err(|e| DomainError::Access(format!("run ioreg: {e}")))?;
    if !output.status.success() {
        return Err(DomainError::Access(format!(
            "ioreg exited with {}",
            output.status
        )));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    parse_ioreg_platform_uuid(&text)
        .map(MachineId::from_raw)
        .ok_or_else(|| DomainError::Access("IOPlatformUUID not found in ioreg output".into()))
}

/// `"IOPlatformUUID" = "XXXXXXXX-..."` の行から値を取り出す
pub fn parse_ioreg_platform_uuid(text: &str) -> Option<&str> {
    text.lines()
        .filter(|line| line.contains("\"IOPlatformUUID\""))
        .find_map(|line| {
            let (_, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then_some(value)
        })
}
