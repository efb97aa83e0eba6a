//! 原本バックアップと変更履歴の台帳。
//!
//! 台帳自身の Mutex で保護する。識別子変更の単一実行ゲートとは独立しており、
//! 履歴の参照が OS への書き込み待ちでブロックされることはない。

use mid_domain::DomainError;
use mid_domain::model::{HistoryAction, HistoryEntry, MachineId, OriginalBackup};
use mid_domain::port::driven::{BackupStore, Clock, HistoryStore, IdGenerator};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub struct LedgerDeps<'a> {
    pub backup: &'a dyn BackupStore,
    pub history: &'a dyn HistoryStore,
    pub clock: &'a dyn Clock,
    pub ids: &'a dyn IdGenerator,
}

#[derive(Default)]
struct LedgerState {
    /// 最後に払い出したタイムスタンプ（未読込なら None）
    last_timestamp: Option<u64>,
}

pub struct Ledger<'a> {
    deps: LedgerDeps<'a>,
    state: Mutex<LedgerState>,
}

impl<'a> Ledger<'a> {
    pub fn new(deps: LedgerDeps<'a>) -> Self {
        Self {
            deps,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// 原本バックアップを保証する（冪等）。
    ///
    /// 既にあればそのまま返す。なければ `initial` の履歴を追記してから
    /// `current` を原本として保存する。追記に失敗した場合はバックアップを
    /// 作らないため、次回の変更で取得をやり直す。
    pub fn ensure_backup(&self, current: &MachineId) -> Result<OriginalBackup, DomainError> {
        let mut state = self.lock_state();
        if let Some(existing) = self.deps.backup.load_backup()? {
            return Ok(existing);
        }
        let initial = self.append_locked(&mut state, current, HistoryAction::Initial)?;
        let backup = OriginalBackup {
            value: initial.machine_id,
            captured_at: initial.timestamp,
        };
        self.deps.backup.save_backup(&backup)?;
        info!(machine_id = %backup.value, "captured original machine identifier");
        Ok(backup)
    }

    /// 履歴を追記する。永続化に失敗した場合は1回だけ再試行する。
    pub fn append_history(
        &self,
        machine_id: &MachineId,
        action: HistoryAction,
    ) -> Result<HistoryEntry, DomainError> {
        let mut state = self.lock_state();
        self.append_locked(&mut state, machine_id, action)
    }

    pub fn get_backup(&self) -> Result<Option<OriginalBackup>, DomainError> {
        let _state = self.lock_state();
        self.deps.backup.load_backup()
    }

    /// 古い順の履歴。表示順の反転は表示層の責務。
    pub fn list_history(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        let _state = self.lock_state();
        self.deps.history.list()
    }

    /// 履歴のみ削除する。原本バックアップは残す。
    pub fn clear_history(&self) -> Result<(), DomainError> {
        let _state = self.lock_state();
        self.deps.history.clear()?;
        info!("machine identifier history cleared");
        Ok(())
    }

    fn append_locked(
        &self,
        state: &mut LedgerState,
        machine_id: &MachineId,
        action: HistoryAction,
    ) -> Result<HistoryEntry, DomainError> {
        let entry = HistoryEntry {
            id: self.deps.ids.new_entry_id(),
            machine_id: machine_id.clone(),
            action,
            timestamp: self.next_timestamp(state),
        };
        if let Err(first) = self.deps.history.append(&entry) {
            warn!(error = %first, action = action.as_str(), "history append failed; retrying once");
            self.deps.history.append(&entry)?;
        }
        Ok(entry)
    }

    /// 単調非減少のタイムスタンプ（時計が巻き戻っても履歴順を崩さない）
    fn next_timestamp(&self, state: &mut LedgerState) -> u64 {
        let last = match state.last_timestamp {
            Some(ts) => ts,
            None => self
                .deps
                .history
                .list()
                .ok()
                .and_then(|entries| entries.last().map(|e| e.timestamp))
                .unwrap_or(0),
        };
        let ts = self.deps.clock.now_ms().max(last);
        state.last_timestamp = Some(ts);
        ts
    }

    fn lock_state(&self) -> MutexGuard<'_, LedgerState> {
        // 状態はタイムスタンプのみなので、poison しても継続して問題ない
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
