//! Windows: `HKLM\SOFTWARE\Microsoft\Cryptography\MachineGuid`（64bit ビュー）

use mid_domain::DomainError;
use mid_domain::model::MachineId;
use tracing::info;
use windows::Win32::Foundation::{
    CloseHandle, ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, HANDLE, WIN32_ERROR,
};
use windows::Win32::Security::{GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation};
use windows::Win32::System::Registry::{
    HKEY, HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE, KEY_SET_VALUE, KEY_WOW64_64KEY, REG_SAM_FLAGS,
    REG_SZ, REG_VALUE_TYPE, RRF_RT_REG_SZ, RegCloseKey, RegGetValueW, RegOpenKeyExW,
    RegSetValueExW,
};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};
use windows::core::PCWSTR;

const CRYPTOGRAPHY_KEY: &str = r"SOFTWARE\Microsoft\Cryptography";
const MACHINE_GUID: &str = "MachineGuid";

#[derive(Debug, Default)]
pub struct RegistryMachineGuid;

impl RegistryMachineGuid {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self) -> Result<MachineId, DomainError> {
        let key = open_key(KEY_QUERY_VALUE).map_err(|status| read_error(status, "open"))?;
        let value_name = to_wide(MACHINE_GUID); // API呼び出し中にVecを生存させる
        let mut value_type = REG_VALUE_TYPE(0);
        let mut size_bytes: u32 = 0;
        let status = unsafe {
            RegGetValueW(
                key,
                PCWSTR::null(),
                PCWSTR(value_name.as_ptr()),
                RRF_RT_REG_SZ,
                Some(&mut value_type),
                None,
                Some(&mut size_bytes),
            )
        };
        if status != ERROR_SUCCESS {
            let _ = unsafe { RegCloseKey(key) };
            return Err(read_error(status, "query"));
        }

        let mut buffer: Vec<u16> = vec![0u16; (size_bytes as usize / 2).max(1)];
        let status = unsafe {
            RegGetValueW(
                key,
                PCWSTR::null(),
                PCWSTR(value_name.as_ptr()),
                RRF_RT_REG_SZ,
                Some(&mut value_type),
                Some(buffer.as_mut_ptr() as *mut _),
                Some(&mut size_bytes),
            )
        };
        let _ = unsafe { RegCloseKey(key) };
        if status != ERROR_SUCCESS {
            return Err(read_error(status, "read"));
        }
        // size_bytesは終端nullを含む
        let char_len = (size_bytes as usize / 2).saturating_sub(1);
        buffer.truncate(char_len);
        let value = String::from_utf16_lossy(&buffer);
        if value.trim().is_empty() {
            return Err(DomainError::Access("MachineGuid is empty".into()));
        }
        Ok(MachineId::from_raw(value))
    }

    /// 単一の RegSetValueExW で置き換える
    pub fn write(&self, id: &MachineId) -> Result<(), DomainError> {
        let key = open_key(KEY_SET_VALUE | KEY_QUERY_VALUE)
            .map_err(|status| write_error(status, "open"))?;
        let data = to_wide(id.as_str());
        let value_name = to_wide(MACHINE_GUID);
        let status = unsafe {
            RegSetValueExW(
                key,
                PCWSTR(value_name.as_ptr()),
                Some(0),
                REG_SZ,
                Some(std::slice::from_raw_parts(
                    data.as_ptr() as *const u8,
                    data.len() * 2,
                )),
            )
        };
        let _ = unsafe { RegCloseKey(key) };
        if status != ERROR_SUCCESS {
            return Err(write_error(status, "set"));
        }
        info!("MachineGuid replaced");
        Ok(())
    }
}

/// 現在のプロセストークンが昇格済みか
pub fn is_elevated() -> bool {
    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut return_length = 0u32;
        let result = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut return_length,
        );

        let _ = CloseHandle(token);
        result.is_ok() && elevation.TokenIsElevated != 0
    }
}

fn open_key(access: REG_SAM_FLAGS) -> Result<HKEY, WIN32_ERROR> {
    let wide_path = to_wide(CRYPTOGRAPHY_KEY);
    let mut key: HKEY = HKEY::default();
    let status = unsafe {
        RegOpenKeyExW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(wide_path.as_ptr()),
            Some(0),
            access | KEY_WOW64_64KEY,
            &mut key,
        )
    };
    if status != ERROR_SUCCESS {
        return Err(status);
    }
    Ok(key)
}

fn read_error(status: WIN32_ERROR, step: &str) -> DomainError {
    if status == ERROR_FILE_NOT_FOUND {
        return DomainError::Access(format!("MachineGuid not found ({step})"));
    }
    DomainError::Access(format!("MachineGuid {step} failed: status={}", status.0))
}

fn write_error(status: WIN32_ERROR, step: &str) -> DomainError {
    if status == ERROR_ACCESS_DENIED {
        return DomainError::Permission(format!("access denied writing MachineGuid ({step})"));
    }
    DomainError::Access(format!("MachineGuid {step} failed: status={}", status.0))
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
