//! 識別子変更エンジン。
//!
//! 変更要求ごとの流れ:
//! 検証 → 権限確認 → （原本未取得なら）バックアップ → 書き込み → 履歴追記
//!
//! 変更と復元は単一実行ゲートで直列化する。後続の呼び出しは拒否せず待機させる。

use crate::ledger::Ledger;
use mid_domain::DomainError;
use mid_domain::model::{
    HistoryAction, MachineId, MutationReport, OriginalBackup, validate_machine_id,
};
use mid_domain::port::driven::{IdGenerator, MachineIdAccessor, MachineIdFile};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub struct MutationDeps<'a> {
    pub accessor: &'a dyn MachineIdAccessor,
    pub ids: &'a dyn IdGenerator,
    pub files: &'a dyn MachineIdFile,
}

pub struct MutationEngine<'a> {
    deps: MutationDeps<'a>,
    ledger: Ledger<'a>,
    gate: Mutex<()>,
}

impl<'a> MutationEngine<'a> {
    pub fn new(deps: MutationDeps<'a>, ledger: Ledger<'a>) -> Self {
        Self {
            deps,
            ledger,
            gate: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &Ledger<'a> {
        &self.ledger
    }

    pub fn accessor(&self) -> &dyn MachineIdAccessor {
        self.deps.accessor
    }

    /// 現在の識別子（OS から直接読む）
    pub fn current(&self) -> Result<MachineId, DomainError> {
        self.deps.accessor.read_current()
    }

    /// 新しいランダム識別子を生成する（適用はしない）
    pub fn generate(&self) -> MachineId {
        self.deps.ids.new_machine_id()
    }

    /// 識別子を変更する。`id` 省略時はランダムな UUID を生成して適用する。
    pub fn change_to(
        &self,
        id: Option<MachineId>,
        action: HistoryAction,
    ) -> Result<MutationReport, DomainError> {
        let id = match id {
            Some(id) => {
                validate_machine_id(id.as_str())?;
                id
            }
            None => self.generate(),
        };
        let _gate = self.lock_gate();
        self.apply_locked(id, action)
    }

    /// 原本バックアップの値へ戻す。
    ///
    /// 現在値が既に原本と等しいかの判定は呼び出し側に任せる。
    pub fn restore_original(&self) -> Result<MutationReport, DomainError> {
        let _gate = self.lock_gate();
        let backup = self.ledger.get_backup()?.ok_or(DomainError::NoBackup)?;
        self.apply_locked(backup.value, HistoryAction::Restore)
    }

    /// 識別子をプレーンテキストとして書き出す
    pub fn export_to_file(&self, path: &Path, id: &MachineId) -> Result<(), DomainError> {
        self.deps.files.write_text(path, id.as_str())
    }

    /// ファイルから識別子を読み込み検証する（適用は別途 `change_to`）
    pub fn import_from_file(&self, path: &Path) -> Result<MachineId, DomainError> {
        let text = self.deps.files.read_text(path)?;
        MachineId::parse(text)
    }

    fn apply_locked(
        &self,
        id: MachineId,
        action: HistoryAction,
    ) -> Result<MutationReport, DomainError> {
        self.ensure_privilege()?;
        self.ensure_backup_captured()?;

        self.deps.accessor.write_new(&id)?;
        info!(machine_id = %id, action = action.as_str(), "machine identifier applied");

        // 書き込みは完了済み。履歴の失敗ではロールバックせず劣化した成功として返す
        let report = MutationReport::new(id);
        match self.ledger.append_history(report.machine_id(), action) {
            Ok(_) => Ok(report),
            Err(err) => {
                warn!(error = %err, "machine identifier changed but history entry was lost");
                Ok(report.with_history_error(Some(err)))
            }
        }
    }

    fn ensure_privilege(&self) -> Result<(), DomainError> {
        let accessor = self.deps.accessor;
        if accessor.requires_elevation() && !accessor.check_admin() {
            return Err(DomainError::Permission(format!(
                "writing the {} machine identifier needs an elevated process",
                accessor.os_type().display_name()
            )));
        }
        Ok(())
    }

    fn ensure_backup_captured(&self) -> Result<OriginalBackup, DomainError> {
        if let Some(existing) = self.ledger.get_backup()? {
            return Ok(existing);
        }
        let current = self.deps.accessor.read_current()?;
        self.ledger.ensure_backup(&current)
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
