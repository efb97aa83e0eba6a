//! MachineIdKeeper の既定パス解決

use std::ffi::OsString;
use std::path::PathBuf;

/// データディレクトリを上書きする環境変数
pub const DATA_DIR_ENV: &str = "MID_DATA_DIR";

#[cfg(any(windows, target_os = "macos"))]
const PRODUCT_DIR: &str = "MachineIdKeeper";
#[cfg(all(unix, not(target_os = "macos")))]
const PRODUCT_DIR_XDG: &str = "machine-id-keeper";

#[cfg(windows)]
fn known_folder_path(id: &windows::core::GUID) -> Option<PathBuf> {
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{KF_FLAG_DEFAULT, SHGetKnownFolderPath};
    use windows::core::PWSTR;

    unsafe {
        let raw: PWSTR = SHGetKnownFolderPath(id, KF_FLAG_DEFAULT, None).ok()?;
        let s = raw.to_string().unwrap_or_default();
        CoTaskMemFree(Some(raw.0 as _));
        if s.is_empty() {
            None
        } else {
            Some(PathBuf::from(s))
        }
    }
}

/// 既定のデータディレクトリ（環境変数による上書きは考慮しない）
///
/// - Windows: `C:\ProgramData\MachineIdKeeper`（既知フォルダ）
/// - macOS: `~/Library/Application Support/MachineIdKeeper`
/// - Linux: `$XDG_DATA_HOME/machine-id-keeper` または `~/.local/share/machine-id-keeper`
/// - 解決できない場合: `./var`
pub fn default_data_dir() -> PathBuf {
    #[cfg(windows)]
    {
        use windows::Win32::UI::Shell::FOLDERID_ProgramData;

        known_folder_path(&FOLDERID_ProgramData)
            .or_else(|| std::env::var_os("ProgramData").map(PathBuf::from))
            .map(|dir| dir.join(PRODUCT_DIR))
            .unwrap_or_else(|| PathBuf::from("./var"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| {
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join(PRODUCT_DIR)
            })
            .unwrap_or_else(|| PathBuf::from("./var"))
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        xdg_data_dir(std::env::var_os("XDG_DATA_HOME"), std::env::var_os("HOME"))
    }
    #[cfg(not(any(windows, unix)))]
    {
        PathBuf::from("./var")
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn xdg_data_dir(xdg_data_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    // XDG 仕様: 相対パスの XDG_DATA_HOME は無視する
    if let Some(xdg) = xdg_data_home.map(PathBuf::from) {
        if xdg.is_absolute() {
            return xdg.join(PRODUCT_DIR_XDG);
        }
    }
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(PRODUCT_DIR_XDG),
        None => PathBuf::from("./var"),
    }
}

/// 実際に使うデータディレクトリ
///
/// 優先順位: 明示指定（CLI `--data-dir`） > `MID_DATA_DIR` > 既定
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    resolve_with(explicit, std::env::var_os(DATA_DIR_ENV))
}

fn resolve_with(explicit: Option<PathBuf>, env_override: Option<OsString>) -> PathBuf {
    explicit
        .or_else(|| env_override.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

/// ログファイル用ディレクトリ
pub fn log_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("logs")
}

/// 状態ファイル用ディレクトリ
pub fn state_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("state")
}
