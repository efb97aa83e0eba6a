//! 昇格再起動アダプター
//!
//! - Windows: `ShellExecuteExW`（runas）で自身を起動し終了を待つ
//! - Linux: `pkexec` 経由で自身を起動し終了を待つ
//! - macOS: 昇格不要

use mid_domain::DomainError;
use mid_domain::model::ElevatedLaunch;
use mid_domain::port::driven::ElevationLauncher;
use std::path::PathBuf;
#[cfg(not(target_os = "macos"))]
use tracing::info;

#[derive(Debug)]
pub struct ElevationAdapter {
    exe: Option<PathBuf>,
}

impl ElevationAdapter {
    /// 現在の実行ファイルを再起動対象にする
    pub fn current_exe() -> Self {
        Self {
            exe: std::env::current_exe().ok(),
        }
    }

    #[cfg_attr(target_os = "macos", allow(dead_code))]
    fn exe(&self) -> Result<&PathBuf, DomainError> {
        self.exe
            .as_ref()
            .ok_or_else(|| DomainError::Launch("cannot locate the current executable".into()))
    }
}

impl ElevationLauncher for ElevationAdapter {
    fn relaunch_elevated(&self, args: &[String]) -> Result<ElevatedLaunch, DomainError> {
        #[cfg(windows)]
        {
            let exe = self.exe()?;
            info!(exe = %exe.display(), "relaunching through UAC");
            windows_impl::run_as_admin_and_wait(exe, args)
        }
        #[cfg(target_os = "macos")]
        {
            let _ = args;
            Ok(ElevatedLaunch::NotRequired)
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let exe = self.exe()?;
            info!(exe = %exe.display(), "relaunching through pkexec");
            let status = std::process::Command::new("pkexec")
                .arg(exe)
                .args(args)
                .status()
                .map_err(|e| DomainError::Launch(format!("pkexec: {e}")))?;
            pkexec_outcome(status.code())
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = (args, self.exe());
            Err(DomainError::Launch("elevation is not supported on this platform".into()))
        }
    }
}

/// pkexec の終了コードを解釈する（126: 認証ダイアログの却下、127: 認可されず）
#[cfg(all(unix, not(target_os = "macos")))]
fn pkexec_outcome(code: Option<i32>) -> Result<ElevatedLaunch, DomainError> {
    match code {
        Some(126) | Some(127) => Err(DomainError::Permission(
            "the authentication request was dismissed or not authorized".into(),
        )),
        code => Ok(ElevatedLaunch::Relaunched { exit_code: code }),
    }
}

/// Windows のコマンドライン引数として1つにまとめる
#[cfg_attr(not(windows), allow(dead_code))]
fn join_windows_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_windows_arg(arg.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `CommandLineToArgvW` の規則で1引数をクォートする。
///
/// `"` の直前、および閉じクォート直前のバックスラッシュは倍にする。
#[cfg_attr(not(windows), allow(dead_code))]
fn quote_windows_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '\n', '\r', '"']) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0usize;
    for ch in arg.chars() {
        match ch {
            '\\' => backslashes += 1,
            '"' => {
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                quoted.push(ch);
                backslashes = 0;
            }
        }
    }
    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}

#[cfg(windows)]
mod windows_impl {
    use super::join_windows_args;
    use mid_domain::DomainError;
    use mid_domain::model::ElevatedLaunch;
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::Win32::Foundation::{CloseHandle, ERROR_CANCELLED, HANDLE};
    use windows::Win32::System::Threading::{GetExitCodeProcess, INFINITE, WaitForSingleObject};
    use windows::Win32::UI::Shell::{SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW, ShellExecuteExW};
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;
    use windows::core::PCWSTR;

    fn wstr(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    pub fn run_as_admin_and_wait(
        exe: &Path,
        args: &[String],
    ) -> Result<ElevatedLaunch, DomainError> {
        let exe_w = wstr(exe.as_os_str());
        let verb_w = wstr(OsStr::new("runas"));
        let params_w = wstr(OsStr::new(&join_windows_args(args)));

        unsafe {
            let mut sei = SHELLEXECUTEINFOW::default();
            sei.cbSize = std::mem::size_of::<SHELLEXECUTEINFOW>() as u32;
            sei.fMask = SEE_MASK_NOCLOSEPROCESS;
            sei.lpVerb = PCWSTR(verb_w.as_ptr());
            sei.lpFile = PCWSTR(exe_w.as_ptr());
            sei.lpParameters = PCWSTR(params_w.as_ptr());
            sei.nShow = SW_SHOWNORMAL.0 as i32;

            if let Err(err) = ShellExecuteExW(&mut sei) {
                if err.code().0 as u32 == ERROR_CANCELLED.0 {
                    return Err(DomainError::Permission("the UAC prompt was cancelled".into()));
                }
                return Err(DomainError::Launch(format!(
                    "ShellExecuteExW failed: {}",
                    err.message()
                )));
            }

            let h: HANDLE = sei.hProcess;
            if h.is_invalid() {
                // 起動はできたが終了コードは取れない
                return Ok(ElevatedLaunch::Relaunched { exit_code: None });
            }
            let wait = WaitForSingleObject(h, INFINITE);
            if wait.0 != 0 {
                let _ = CloseHandle(h);
                return Ok(ElevatedLaunch::Relaunched { exit_code: None });
            }
            let mut code: u32 = 1;
            let exit_code = GetExitCodeProcess(h, &mut code).ok().map(|_| code as i32);
            let _ = CloseHandle(h);
            Ok(ElevatedLaunch::Relaunched { exit_code })
        }
    }
}
