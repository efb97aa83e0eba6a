//! テスト用のモックポート

use crate::binding::BindingPolicy;
use crate::config::ConfigStore;
use crate::{MachineIdDeps, MachineIdService};
use mid_domain::DomainError;
use mid_domain::model::{
    AccountBindings, AccountId, AccountSummary, ElevatedLaunch, HistoryEntry, MachineId,
    MachineIdConfig, OriginalBackup, OsType,
};
use mid_domain::port::driven::{
    AccountDirectory, BackupStore, BindingRepository, Clock, ConfigRepository, ElevationLauncher,
    HistoryStore, IdGenerator, MachineIdAccessor, MachineIdFile,
};
use mid_engine::{Ledger, LedgerDeps, MutationDeps, MutationEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

pub fn mid(value: &str) -> MachineId {
    MachineId::parse(value).unwrap()
}

pub struct MockAccessor {
    value: Mutex<MachineId>,
    admin: AtomicBool,
    requires_elevation: AtomicBool,
}

impl MockAccessor {
    pub fn new(initial: &str) -> Self {
        Self {
            value: Mutex::new(MachineId::from_raw(initial)),
            admin: AtomicBool::new(true),
            requires_elevation: AtomicBool::new(true),
        }
    }

    pub fn current(&self) -> MachineId {
        self.value.lock().unwrap().clone()
    }

    pub fn set_admin(&self, admin: bool) {
        self.admin.store(admin, Ordering::SeqCst);
    }

    pub fn set_requires_elevation(&self, required: bool) {
        self.requires_elevation.store(required, Ordering::SeqCst);
    }
}

impl MachineIdAccessor for MockAccessor {
    fn os_type(&self) -> OsType {
        OsType::Windows
    }

    fn read_current(&self) -> Result<MachineId, DomainError> {
        Ok(self.current())
    }

    fn write_new(&self, id: &MachineId) -> Result<(), DomainError> {
        *self.value.lock().unwrap() = id.clone();
        Ok(())
    }

    fn check_admin(&self) -> bool {
        self.admin.load(Ordering::SeqCst)
    }

    fn requires_elevation(&self) -> bool {
        self.requires_elevation.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockBackupStore {
    backup: Mutex<Option<OriginalBackup>>,
}

impl BackupStore for MockBackupStore {
    fn load_backup(&self) -> Result<Option<OriginalBackup>, DomainError> {
        Ok(self.backup.lock().unwrap().clone())
    }

    fn save_backup(&self, backup: &OriginalBackup) -> Result<(), DomainError> {
        *self.backup.lock().unwrap() = Some(backup.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    fail: AtomicBool,
}

impl MockHistoryStore {
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl HistoryStore for MockHistoryStore {
    fn append(&self, entry: &HistoryEntry) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("history log is read-only".into()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        Ok(self.entries())
    }

    fn clear(&self) -> Result<(), DomainError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct MockBindingRepo {
    saved: Mutex<AccountBindings>,
    fail: AtomicBool,
}

impl MockBindingRepo {
    pub fn saved(&self) -> AccountBindings {
        self.saved.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl BindingRepository for MockBindingRepo {
    fn load_bindings(&self) -> Result<AccountBindings, DomainError> {
        Ok(self.saved())
    }

    fn save_bindings(&self, bindings: &AccountBindings) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("bindings file is read-only".into()));
        }
        *self.saved.lock().unwrap() = bindings.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MockConfigRepo {
    saved: Mutex<Option<MachineIdConfig>>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl MockConfigRepo {
    pub fn saved(&self) -> Option<MachineIdConfig> {
        *self.saved.lock().unwrap()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl ConfigRepository for MockConfigRepo {
    fn load(&self) -> Result<MachineIdConfig, DomainError> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, config: &MachineIdConfig) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("settings file is read-only".into()));
        }
        *self.saved.lock().unwrap() = Some(*config);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self) -> bool {
        self.saved.lock().unwrap().is_some()
    }
}

/// 昇格要求の記録。`cancel` で UAC キャンセルを再現する
#[derive(Default)]
pub struct MockElevation {
    requests: Mutex<Vec<Vec<String>>>,
    cancel: AtomicBool,
}

impl MockElevation {
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cancel_prompts(&self, cancel: bool) {
        self.cancel.store(cancel, Ordering::SeqCst);
    }
}

impl ElevationLauncher for MockElevation {
    fn relaunch_elevated(&self, args: &[String]) -> Result<ElevatedLaunch, DomainError> {
        self.requests.lock().unwrap().push(args.to_vec());
        if self.cancel.load(Ordering::SeqCst) {
            return Err(DomainError::Permission("elevation prompt was cancelled".into()));
        }
        Ok(ElevatedLaunch::Relaunched { exit_code: None })
    }
}

#[derive(Default)]
pub struct MockAccounts {
    emails: Mutex<HashMap<String, String>>,
}

impl MockAccounts {
    pub fn add(&self, id: &str, email: &str) {
        self.emails
            .lock()
            .unwrap()
            .insert(id.to_string(), email.to_string());
    }
}

impl AccountDirectory for MockAccounts {
    fn lookup_account(&self, id: &AccountId) -> Option<AccountSummary> {
        let emails = self.emails.lock().unwrap();
        emails.get(id.as_str()).map(|email| AccountSummary {
            id: id.clone(),
            email: Some(email.clone()),
        })
    }
}

pub struct MockClock {
    now: AtomicU64,
}

impl Default for MockClock {
    fn default() -> Self {
        Self {
            now: AtomicU64::new(1_700_000_000_000),
        }
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockIds {
    next: AtomicU64,
}

impl IdGenerator for MockIds {
    fn new_machine_id(&self) -> MachineId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        MachineId::from_raw(format!("00000000-0000-4000-8000-{:012x}", n))
    }

    fn new_entry_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("entry-{n}")
    }
}

#[derive(Default)]
pub struct MockFiles {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MockFiles {
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn put(&self, path: &Path, text: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), text.to_string());
    }
}

impl MachineIdFile for MockFiles {
    fn write_text(&self, path: &Path, text: &str) -> Result<(), DomainError> {
        self.put(path, text);
        Ok(())
    }

    fn read_text(&self, path: &Path) -> Result<String, DomainError> {
        self.get(path)
            .ok_or_else(|| DomainError::Access(format!("{} not found", path.display())))
    }
}

pub struct Ports {
    pub accessor: MockAccessor,
    pub elevation: MockElevation,
    pub backup: MockBackupStore,
    pub history: MockHistoryStore,
    pub bindings: MockBindingRepo,
    pub config: MockConfigRepo,
    pub accounts: MockAccounts,
    pub clock: MockClock,
    pub ids: MockIds,
    pub files: MockFiles,
}

impl Ports {
    pub fn new(initial: &str) -> Self {
        Self {
            accessor: MockAccessor::new(initial),
            elevation: MockElevation::default(),
            backup: MockBackupStore::default(),
            history: MockHistoryStore::default(),
            bindings: MockBindingRepo::default(),
            config: MockConfigRepo::default(),
            accounts: MockAccounts::default(),
            clock: MockClock::default(),
            ids: MockIds::default(),
            files: MockFiles::default(),
        }
    }

    /// エンジン・設定・バインディングポリシーを個別に組み立てる
    pub fn parts(&self) -> (MutationEngine<'_>, ConfigStore<'_>, BindingPolicy<'_>) {
        let ledger = Ledger::new(LedgerDeps {
            backup: &self.backup,
            history: &self.history,
            clock: &self.clock,
            ids: &self.ids,
        });
        let engine = MutationEngine::new(
            MutationDeps {
                accessor: &self.accessor,
                ids: &self.ids,
                files: &self.files,
            },
            ledger,
        );
        let config = ConfigStore::load(&self.config).unwrap();
        let policy = BindingPolicy::load(&self.bindings).unwrap();
        (engine, config, policy)
    }

    pub fn service(&self) -> MachineIdService<'_> {
        MachineIdService::new(MachineIdDeps {
            accessor: &self.accessor,
            elevation: &self.elevation,
            backup: &self.backup,
            history: &self.history,
            bindings: &self.bindings,
            config: &self.config,
            accounts: &self.accounts,
            clock: &self.clock,
            ids: &self.ids,
            files: &self.files,
        })
        .unwrap()
    }
}
