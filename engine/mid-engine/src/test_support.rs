//! テスト用のモックポート

use crate::ledger::{Ledger, LedgerDeps};
use crate::mutation::{MutationDeps, MutationEngine};
use mid_domain::DomainError;
use mid_domain::model::{HistoryEntry, MachineId, OriginalBackup, OsType};
use mid_domain::port::driven::{
    BackupStore, Clock, HistoryStore, IdGenerator, MachineIdAccessor, MachineIdFile,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn mid(value: &str) -> MachineId {
    MachineId::parse(value).unwrap()
}

pub struct MockAccessor {
    value: Mutex<MachineId>,
    admin: AtomicBool,
    requires_elevation: AtomicBool,
    fail_reads: AtomicBool,
    written: Mutex<Vec<MachineId>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay_ms: AtomicU64,
}

impl MockAccessor {
    pub fn new(initial: &str) -> Self {
        Self {
            value: Mutex::new(MachineId::from_raw(initial)),
            admin: AtomicBool::new(true),
            requires_elevation: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            written: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn set_admin(&self, admin: bool) {
        self.admin.store(admin, Ordering::SeqCst);
    }

    pub fn set_requires_elevation(&self, required: bool) {
        self.requires_elevation.store(required, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_delay_ms(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    pub fn written_values(&self) -> Vec<MachineId> {
        self.written.lock().unwrap().clone()
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl MachineIdAccessor for MockAccessor {
    fn os_type(&self) -> OsType {
        OsType::Linux
    }

    fn read_current(&self) -> Result<MachineId, DomainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::Access("machine-id missing".into()));
        }
        Ok(self.value.lock().unwrap().clone())
    }

    fn write_new(&self, id: &MachineId) -> Result<(), DomainError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        *self.value.lock().unwrap() = id.clone();
        self.written.lock().unwrap().push(id.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
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
    failures_left: AtomicUsize,
}

impl MockHistoryStore {
    pub fn fail_next_appends(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl HistoryStore for MockHistoryStore {
    fn append(&self, entry: &HistoryEntry) -> Result<(), DomainError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(DomainError::Persistence("disk full".into()));
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

/// 呼び出しごとに1msずつ進む時計
pub struct MockClock {
    now: AtomicU64,
}

impl MockClock {
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
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
    pub backup: MockBackupStore,
    pub history: MockHistoryStore,
    pub clock: MockClock,
    pub ids: MockIds,
    pub files: MockFiles,
}

impl Ports {
    pub fn new(initial: &str) -> Self {
        Self {
            accessor: MockAccessor::new(initial),
            backup: MockBackupStore::default(),
            history: MockHistoryStore::default(),
            clock: MockClock::default(),
            ids: MockIds::default(),
            files: MockFiles::default(),
        }
    }

    pub fn ledger_deps(&self) -> LedgerDeps<'_> {
        LedgerDeps {
            backup: &self.backup,
            history: &self.history,
            clock: &self.clock,
            ids: &self.ids,
        }
    }

    pub fn engine(&self) -> MutationEngine<'_> {
        MutationEngine::new(
            MutationDeps {
                accessor: &self.accessor,
                ids: &self.ids,
                files: &self.files,
            },
            Ledger::new(self.ledger_deps()),
        )
    }
}
