//! ファイルシステムアダプター（設定/原本バックアップ/履歴/バインディング永続化）
//! JSONファイル＋JSONL履歴で実装。
use mid_domain::DomainError;
use mid_domain::model::{
    AccountBindings, AccountId, AccountSummary, HistoryAction, HistoryEntry, MachineId,
    MachineIdConfig, OriginalBackup,
};
use mid_domain::port::driven::{
    AccountDirectory, BackupStore, BindingRepository, ConfigRepository, HistoryStore,
    MachineIdFile,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

fn ends_mid_line(f: &mut fs::File) -> std::io::Result<bool> {
    if f.metadata()?.len() == 0 {
        return Ok(false);
    }
    f.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[derive(Debug)]
pub struct FsAdapter {
    config_path: PathBuf,
    backup_path: PathBuf,
    history_path: PathBuf,
    bindings_path: PathBuf,
    accounts_path: PathBuf,
}

#[cfg(windows)]
const HISTORY_MUTEX_NAME: &str = r"Global\MachineIdKeeperHistoryMutex";
#[cfg(windows)]
const HISTORY_MUTEX_NAME_LOCAL: &str = r"Local\MachineIdKeeperHistoryMutex";

/// 昇格した別プロセスと履歴ファイルを共有するためのプロセス間ロック
#[cfg(windows)]
struct HistoryMutexGuard {
    handle: windows::Win32::Foundation::HANDLE,
}

#[cfg(windows)]
impl Drop for HistoryMutexGuard {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::ReleaseMutex;
        unsafe {
            let _ = ReleaseMutex(self.handle);
            let _ = CloseHandle(self.handle);
        }
    }
}

#[cfg(windows)]
fn try_acquire_history_mutex(timeout_ms: u32) -> Option<HistoryMutexGuard> {
    use windows::Win32::Foundation::{CloseHandle, WAIT_ABANDONED, WAIT_OBJECT_0};
    use windows::Win32::System::Threading::{CreateMutexW, WaitForSingleObject};
    use windows::core::PCWSTR;

    fn acquire(name: &str, timeout_ms: u32) -> Result<Option<HistoryMutexGuard>, ()> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let handle = unsafe { CreateMutexW(None, false, PCWSTR(wide.as_ptr())) }.map_err(|_| ())?;
        let wait = unsafe { WaitForSingleObject(handle, timeout_ms) };
        if wait == WAIT_OBJECT_0 || wait == WAIT_ABANDONED {
            return Ok(Some(HistoryMutexGuard { handle }));
        }
        unsafe {
            let _ = CloseHandle(handle);
        }
        Ok(None)
    }

    match acquire(HISTORY_MUTEX_NAME, timeout_ms) {
        Ok(guard) => guard,
        // Global 名前空間に作成できない（非管理者）場合は Local で代替
        Err(()) => acquire(HISTORY_MUTEX_NAME_LOCAL, timeout_ms).ok().flatten(),
    }
}

#[cfg(not(windows))]
struct HistoryMutexGuard;

#[cfg(not(windows))]
fn try_acquire_history_mutex(_timeout_ms: u32) -> Option<HistoryMutexGuard> {
    Some(HistoryMutexGuard)
}

impl FsAdapter {
    /// 指定ルートディレクトリでアダプターを作成。ファイルは遅延作成。
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let config_dir = root.join("config");
        let state_dir = root.join("state");
        let log_dir = root.join("logs");
        Self {
            config_path: config_dir.join("machine-id-config.json"),
            backup_path: state_dir.join("original-backup.json"),
            history_path: log_dir.join("machine-id-history.jsonl"),
            bindings_path: state_dir.join("account-bindings.json"),
            accounts_path: root.join("accounts.json"),
        }
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    fn ensure_parent_dir(path: &Path) -> Result<(), std::io::Error> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T, what: &str) -> Result<(), DomainError> {
        let data = serde_json::to_string_pretty(value)
            .map_err(|e| DomainError::Persistence(format!("serialize {what}: {e}")))?;
        write_atomic(path, data.as_bytes())
            .map_err(|e| DomainError::Persistence(format!("write {what}: {e}")))
    }

    /// 存在しなければ None
    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &Path,
        what: &str,
    ) -> Result<Option<T>, DomainError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::Persistence(format!("read {what}: {e}"))),
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| DomainError::Persistence(format!("parse {what}: {e}")))
    }
}

impl ConfigRepository for FsAdapter {
    fn load(&self) -> Result<MachineIdConfig, DomainError> {
        let dto: Option<ConfigDto> = self.read_json(&self.config_path, "settings")?;
        Ok(dto.map(MachineIdConfig::from).unwrap_or_default())
    }

    fn save(&self, config: &MachineIdConfig) -> Result<(), DomainError> {
        self.write_json(&self.config_path, &ConfigDto::from(*config), "settings")
    }

    fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

impl BackupStore for FsAdapter {
    fn load_backup(&self) -> Result<Option<OriginalBackup>, DomainError> {
        let dto: Option<BackupDto> = self.read_json(&self.backup_path, "original backup")?;
        Ok(dto.map(|d| OriginalBackup {
            value: MachineId::from_raw(d.value),
            captured_at: d.captured_at,
        }))
    }

    fn save_backup(&self, backup: &OriginalBackup) -> Result<(), DomainError> {
        let dto = BackupDto {
            value: backup.value.as_str().to_string(),
            captured_at: backup.captured_at,
        };
        self.write_json(&self.backup_path, &dto, "original backup")
    }
}

impl HistoryStore for FsAdapter {
    fn append(&self, entry: &HistoryEntry) -> Result<(), DomainError> {
        let mut lock = None;
        for _ in 0..3 {
            if let Some(guard) = try_acquire_history_mutex(50) {
                lock = Some(guard);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let Some(_lock) = lock else {
            return Err(DomainError::Persistence(
                "history lock busy; failed to append entry".into(),
            ));
        };

        let line = serde_json::to_string(&HistoryDto::from(entry))
            .map_err(|e| DomainError::Persistence(format!("serialize history entry: {e}")))?;
        Self::ensure_parent_dir(&self.history_path)
            .map_err(|e| DomainError::Persistence(format!("create history dir: {e}")))?;
        let mut f = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.history_path)
            .map_err(|e| DomainError::Persistence(format!("open history: {e}")))?;
        // 末尾が途切れた行なら改行で閉じてから追記する
        let record = if ends_mid_line(&mut f)
            .map_err(|e| DomainError::Persistence(format!("inspect history: {e}")))?
        {
            warn!("history file ended mid-line; terminating it before append");
            format!("\n{line}\n")
        } else {
            format!("{line}\n")
        };
        f.write_all(record.as_bytes())
            .map_err(|e| DomainError::Persistence(format!("write history: {e}")))?;
        let _ = f.sync_data();
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        let data = match fs::read_to_string(&self.history_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DomainError::Persistence(format!("read history: {e}"))),
        };
        let mut entries = Vec::new();
        for (index, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            // 途中で途切れた行は読み飛ばし、残りの履歴は返す
            let parsed = serde_json::from_str::<HistoryDto>(line)
                .map_err(|e| e.to_string())
                .and_then(HistoryDto::into_entry);
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = index + 1, error = %e, "skipping unreadable history line"),
            }
        }
        Ok(entries)
    }

    fn clear(&self) -> Result<(), DomainError> {
        match fs::remove_file(&self.history_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Persistence(format!("remove history: {e}"))),
        }
    }
}

impl BindingRepository for FsAdapter {
    fn load_bindings(&self) -> Result<AccountBindings, DomainError> {
        let raw: Option<BTreeMap<String, String>> =
            self.read_json(&self.bindings_path, "account bindings")?;
        let mut bindings = AccountBindings::new();
        for (account, machine_id) in raw.unwrap_or_default() {
            let account = AccountId::new(account)
                .map_err(|e| DomainError::Persistence(format!("account bindings: {e}")))?;
            bindings.insert(account, MachineId::from_raw(machine_id));
        }
        Ok(bindings)
    }

    fn save_bindings(&self, bindings: &AccountBindings) -> Result<(), DomainError> {
        let raw: BTreeMap<&str, &str> = bindings
            .iter()
            .map(|(account, id)| (account.as_str(), id.as_str()))
            .collect();
        self.write_json(&self.bindings_path, &raw, "account bindings")
    }
}

impl AccountDirectory for FsAdapter {
    fn lookup_account(&self, id: &AccountId) -> Option<AccountSummary> {
        // アカウントストアは外部管理。読めなければ未登録扱い
        let accounts: Vec<AccountDto> = match self.read_json(&self.accounts_path, "accounts") {
            Ok(Some(accounts)) => accounts,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "account store unreadable");
                return None;
            }
        };
        accounts
            .into_iter()
            .find(|a| a.id == id.as_str())
            .map(|a| AccountSummary {
                id: id.clone(),
                email: a.email.filter(|e| !e.is_empty()),
            })
    }
}

impl MachineIdFile for FsAdapter {
    fn write_text(&self, path: &Path, text: &str) -> Result<(), DomainError> {
        write_atomic(path, text.as_bytes())
            .map_err(|e| DomainError::Access(format!("write {}: {e}", path.display())))
    }

    fn read_text(&self, path: &Path) -> Result<String, DomainError> {
        fs::read_to_string(path)
            .map_err(|e| DomainError::Access(format!("read {}: {e}", path.display())))
    }
}

// ---------- 内部ヘルパー ----------

/// 同一ディレクトリの一時ファイルへ書いてから置き換える
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    FsAdapter::ensure_parent_dir(path)?;
    let tmp_path = temp_path_for(path);
    {
        let mut f = fs::File::create(&tmp_path)?;
        if let Err(e) = f.write_all(data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        let _ = f.sync_all();
    }
    #[cfg(windows)]
    {
        if path.exists() {
            if let Err(e) = replace_file(&tmp_path, path) {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
            return Ok(());
        }
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp.{}.{nanos}", std::process::id()))
}

#[cfg(windows)]
fn replace_file(src: &Path, dst: &Path) -> Result<(), std::io::Error> {
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::Storage::FileSystem::{REPLACE_FILE_FLAGS, ReplaceFileW};
    use windows::core::PCWSTR;

    fn to_wide(path: &Path) -> Vec<u16> {
        path.as_os_str().encode_wide().chain(std::iter::once(0)).collect()
    }
    let src_w = to_wide(src);
    let dst_w = to_wide(dst);
    unsafe {
        ReplaceFileW(
            PCWSTR(dst_w.as_ptr()),
            PCWSTR(src_w.as_ptr()),
            PCWSTR::null(),
            REPLACE_FILE_FLAGS(0),
            None,
            None,
        )
    }
    .map_err(|e| std::io::Error::other(format!("ReplaceFileW failed: {}", e.message())))
}

// ---------- DTO 定義 ----------

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ConfigDto {
    auto_switch_on_account_change: bool,
    bind_machine_id_to_account: bool,
    use_binded_machine_id: bool,
}

impl From<MachineIdConfig> for ConfigDto {
    fn from(cfg: MachineIdConfig) -> Self {
        Self {
            auto_switch_on_account_change: cfg.auto_switch_on_account_change,
            bind_machine_id_to_account: cfg.bind_machine_id_to_account,
            use_binded_machine_id: cfg.use_binded_machine_id,
        }
    }
}

impl From<ConfigDto> for MachineIdConfig {
    fn from(dto: ConfigDto) -> Self {
        Self {
            auto_switch_on_account_change: dto.auto_switch_on_account_change,
            bind_machine_id_to_account: dto.bind_machine_id_to_account,
            use_binded_machine_id: dto.use_binded_machine_id,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupDto {
    value: String,
    captured_at: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDto {
    id: String,
    machine_id: String,
    action: String,
    timestamp: u64,
}

impl From<&HistoryEntry> for HistoryDto {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            machine_id: entry.machine_id.as_str().to_string(),
            action: entry.action.as_str().to_string(),
            timestamp: entry.timestamp,
        }
    }
}

impl HistoryDto {
    fn into_entry(self) -> Result<HistoryEntry, String> {
        let action = HistoryAction::from_str(&self.action)
            .ok_or_else(|| format!("unknown action {:?}", self.action))?;
        Ok(HistoryEntry {
            id: self.id,
            machine_id: MachineId::from_raw(self.machine_id),
            action,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Deserialize)]
struct AccountDto {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(id: &str, value: &str, action: HistoryAction, timestamp: u64) -> HistoryEntry {
        HistoryEntry {
            id: id.into(),
            machine_id: MachineId::from_raw(value),
            action,
            timestamp,
        }
    }

    #[test]
    fn config_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        assert!(!fs.exists());
        assert_eq!(fs.load().unwrap(), MachineIdConfig::default());
    }

    #[test]
    fn config_uses_camel_case_keys() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let cfg = MachineIdConfig {
            auto_switch_on_account_change: true,
            bind_machine_id_to_account: true,
            use_binded_machine_id: false,
        };
        fs.save(&cfg).unwrap();

        let raw = fs::read_to_string(dir.path().join("config/machine-id-config.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["autoSwitchOnAccountChange"], true);
        assert_eq!(value["bindMachineIdToAccount"], true);
        assert_eq!(value["useBindedMachineId"], false);
        assert!(fs.exists());
        assert_eq!(fs.load().unwrap(), cfg);
    }

    #[test]
    fn partial_config_fills_missing_keys_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config/machine-id-config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"bindMachineIdToAccount": true}"#).unwrap();

        let cfg = FsAdapter::new(dir.path()).load().unwrap();
        assert!(cfg.bind_machine_id_to_account);
        assert!(!cfg.auto_switch_on_account_change);
    }

    #[test]
    fn corrupt_config_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config/machine-id-config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let err = FsAdapter::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));
    }

    #[test]
    fn backup_is_stored_with_captured_at() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        assert!(fs.load_backup().unwrap().is_none());

        let backup = OriginalBackup {
            value: MachineId::from_raw("pristine"),
            captured_at: 1_700_000_000_123,
        };
        fs.save_backup(&backup).unwrap();

        let raw = fs::read_to_string(dir.path().join("state/original-backup.json")).unwrap();
        assert!(raw.contains("\"capturedAt\""));
        assert_eq!(fs.load_backup().unwrap(), Some(backup));
    }

    #[test]
    fn history_appends_one_line_per_entry_in_order() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let first = entry("e1", "pristine", HistoryAction::Initial, 10);
        let second = entry("e2", "next", HistoryAction::AutoSwitch, 11);
        fs.append(&first).unwrap();
        fs.append(&second).unwrap();

        let raw = fs::read_to_string(fs.history_path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().nth(1).unwrap().contains("\"action\":\"auto_switch\""));
        assert!(raw.contains("\"machineId\":\"pristine\""));
        assert_eq!(fs.list().unwrap(), vec![first, second]);
    }

    #[test]
    fn truncated_history_line_is_skipped() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        fs.append(&entry("e1", "a", HistoryAction::Manual, 1)).unwrap();
        let mut f = OpenOptions::new()
            .append(true)
            .open(fs.history_path())
            .unwrap();
        f.write_all(b"{\"id\":\"e2\",\"machi").unwrap();

        let listed = fs.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "e1");
    }

    #[test]
    fn append_after_truncated_line_is_kept() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        fs.append(&entry("e1", "a", HistoryAction::Manual, 1)).unwrap();
        let mut f = OpenOptions::new()
            .append(true)
            .open(fs.history_path())
            .unwrap();
        f.write_all(b"{\"id\":\"e2\",\"machi").unwrap();
        drop(f);

        fs.append(&entry("e3", "c", HistoryAction::Restore, 3)).unwrap();

        let ids: Vec<_> = fs.list().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
    }

    #[test]
    fn clearing_history_keeps_backup() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        fs.save_backup(&OriginalBackup {
            value: MachineId::from_raw("pristine"),
            captured_at: 1,
        })
        .unwrap();
        fs.append(&entry("e1", "pristine", HistoryAction::Initial, 1))
            .unwrap();

        fs.clear().unwrap();
        fs.clear().unwrap();

        assert!(fs.list().unwrap().is_empty());
        assert!(fs.load_backup().unwrap().is_some());
    }

    #[test]
    fn bindings_are_a_flat_object() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let mut bindings = AccountBindings::new();
        bindings.insert(AccountId::new("acct-1").unwrap(), MachineId::from_raw("id-1"));
        fs.save_bindings(&bindings).unwrap();

        let raw = fs::read_to_string(dir.path().join("state/account-bindings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["acct-1"], "id-1");
        assert_eq!(fs.load_bindings().unwrap(), bindings);
    }

    #[test]
    fn account_lookup_reads_optional_store() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let id = AccountId::new("acct-1").unwrap();
        assert!(fs.lookup_account(&id).is_none());

        fs::write(
            dir.path().join("accounts.json"),
            r#"[{"id":"acct-1","email":"one@example.com"},{"id":"acct-2"}]"#,
        )
        .unwrap();

        let found = fs.lookup_account(&id).unwrap();
        assert_eq!(found.email.as_deref(), Some("one@example.com"));
        let bare = fs.lookup_account(&AccountId::new("acct-2").unwrap()).unwrap();
        assert!(bare.email.is_none());
    }

    #[test]
    fn export_overwrites_and_missing_import_is_access_error() {
        let dir = tempdir().unwrap();
        let fs = FsAdapter::new(dir.path());
        let path = dir.path().join("out/machine-id.txt");
        fs.write_text(&path, "old").unwrap();
        fs.write_text(&path, "new").unwrap();
        assert_eq!(fs.read_text(&path).unwrap(), "new");

        let err = fs.read_text(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, DomainError::Access(_)));
    }
}
