//! プラットフォーム別の機械識別子アクセサ
//!
//! 起動時に `PlatformAccessor::detect` で一度だけ選択する。

mod file;
mod macos;
#[cfg(windows)]
mod registry;

pub use file::{LinuxMachineIdFile, PrivilegeCheck};
pub use macos::{MacOverride, parse_ioreg_platform_uuid};
#[cfg(windows)]
pub use registry::RegistryMachineGuid;

use mid_domain::DomainError;
use mid_domain::model::{MachineId, OsType};
use mid_domain::port::driven::MachineIdAccessor;
use std::path::Path;

pub enum PlatformAccessor {
    #[cfg(windows)]
    Windows(RegistryMachineGuid),
    Linux(LinuxMachineIdFile),
    MacOs(MacOverride),
    Unsupported,
}

impl PlatformAccessor {
    /// 実行中の OS に合わせたアクセサを選ぶ
    pub fn detect(data_dir: &Path) -> Self {
        #[cfg(windows)]
        {
            let _ = data_dir;
            Self::Windows(RegistryMachineGuid::new())
        }
        #[cfg(target_os = "macos")]
        {
            Self::MacOs(MacOverride::in_data_dir(data_dir))
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let _ = data_dir;
            Self::Linux(LinuxMachineIdFile::system())
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = data_dir;
            Self::Unsupported
        }
    }

    fn unsupported() -> DomainError {
        DomainError::Access("machine identifier is not supported on this platform".into())
    }
}

impl MachineIdAccessor for PlatformAccessor {
    fn os_type(&self) -> OsType {
        match self {
            #[cfg(windows)]
            Self::Windows(_) => OsType::Windows,
            Self::Linux(_) => OsType::Linux,
            Self::MacOs(_) => OsType::MacOs,
            Self::Unsupported => OsType::Unknown,
        }
    }

    fn read_current(&self) -> Result<MachineId, DomainError> {
        match self {
            #[cfg(windows)]
            Self::Windows(registry) => registry.read(),
            Self::Linux(file) => file.read(),
            Self::MacOs(mac) => mac.read(),
            Self::Unsupported => Err(Self::unsupported()),
        }
    }

    fn write_new(&self, id: &MachineId) -> Result<(), DomainError> {
        mid_domain::model::validate_machine_id(id.as_str())?;
        match self {
            #[cfg(windows)]
            Self::Windows(registry) => registry.write(id),
            Self::Linux(file) => file.write(id),
            Self::MacOs(mac) => mac.write(id),
            Self::Unsupported => Err(Self::unsupported()),
        }
    }

    fn check_admin(&self) -> bool {
        match self {
            #[cfg(windows)]
            Self::Windows(_) => registry::is_elevated(),
            Self::Linux(file) => file.is_privileged(),
            Self::MacOs(_) => true,
            Self::Unsupported => false,
        }
    }

    fn requires_elevation(&self) -> bool {
        match self {
            #[cfg(windows)]
            Self::Windows(_) => true,
            Self::Linux(_) => true,
            Self::MacOs(_) | Self::Unsupported => false,
        }
    }
}
