//! mid-app: アプリケーション層のファサード。
//! 識別子変更エンジン、設定ストア、アカウントバインディングを束ね、
//! 表示層（CLI）へ `MachineIdUseCase` として公開する。

use mid_domain::DomainError;
use mid_domain::model::{
    AccountBindings, AccountId, BindingView, ConfigPatch, ElevatedLaunch, HistoryAction,
    HistoryEntry, ImportOutcome, MachineId, MachineIdConfig, MutationReport, OriginalBackup,
    OsType,
};
use mid_domain::port::driven::{
    AccountDirectory, BackupStore, BindingRepository, Clock, ConfigRepository, ElevationLauncher,
    HistoryStore, IdGenerator, MachineIdAccessor, MachineIdFile,
};
use mid_domain::port::driving::MachineIdUseCase;
use mid_engine::{Ledger, LedgerDeps, MutationDeps, MutationEngine};
use std::path::Path;
use tracing::info;

pub mod binding;
pub mod config;
pub use binding::{BindingChange, BindingPolicy, SwitchOutcome};
pub use config::ConfigStore;

#[cfg(test)]
mod test_support;

pub struct MachineIdDeps<'a> {
    pub accessor: &'a dyn MachineIdAccessor,
    pub elevation: &'a dyn ElevationLauncher,
    pub backup: &'a dyn BackupStore,
    pub history: &'a dyn HistoryStore,
    pub bindings: &'a dyn BindingRepository,
    pub config: &'a dyn ConfigRepository,
    pub accounts: &'a dyn AccountDirectory,
    pub clock: &'a dyn Clock,
    pub ids: &'a dyn IdGenerator,
    pub files: &'a dyn MachineIdFile,
}

pub struct MachineIdService<'a> {
    engine: MutationEngine<'a>,
    policy: BindingPolicy<'a>,
    config: ConfigStore<'a>,
    elevation: &'a dyn ElevationLauncher,
    accounts: &'a dyn AccountDirectory,
}

impl<'a> MachineIdService<'a> {
    /// 設定とバインディングを読み込んでサービスを組み立てる
    pub fn new(deps: MachineIdDeps<'a>) -> Result<Self, DomainError> {
        let ledger = Ledger::new(LedgerDeps {
            backup: deps.backup,
            history: deps.history,
            clock: deps.clock,
            ids: deps.ids,
        });
        let engine = MutationEngine::new(
            MutationDeps {
                accessor: deps.accessor,
                ids: deps.ids,
                files: deps.files,
            },
            ledger,
        );
        Ok(Self {
            engine,
            policy: BindingPolicy::load(deps.bindings)?,
            config: ConfigStore::load(deps.config)?,
            elevation: deps.elevation,
            accounts: deps.accounts,
        })
    }

    /// アカウント切替の通知
    pub fn on_account_switched(&self, account_id: &str) -> Result<SwitchOutcome, DomainError> {
        let account = AccountId::new(account_id)?;
        self.policy
            .on_account_switched(&self.engine, &self.config, &account)
    }

    /// アカウント削除の通知。バインドがあれば外す
    pub fn on_account_deleted(&self, account_id: &str) -> Result<bool, DomainError> {
        let account = AccountId::new(account_id)?;
        self.policy.forget_account(&account)
    }

    pub fn rebind(
        &self,
        account_id: &str,
        machine_id: MachineId,
    ) -> Result<MutationReport, DomainError> {
        let account = AccountId::new(account_id)?;
        self.policy
            .rebind(self.engine.ledger(), &account, machine_id)
    }

    pub fn clear_bindings(&self) -> Result<(), DomainError> {
        self.policy.clear_bindings()
    }

    pub fn config(&self) -> MachineIdConfig {
        self.config.current()
    }

    pub fn update_config(&self, patch: &ConfigPatch) -> Result<MachineIdConfig, DomainError> {
        self.config.update(patch)
    }

    pub fn get_backup(&self) -> Result<Option<OriginalBackup>, DomainError> {
        self.engine.ledger().get_backup()
    }

    /// 現在値が原本と一致するか（原本未取得なら false）
    pub fn is_current_original(&self) -> Result<bool, DomainError> {
        match self.get_backup()? {
            Some(backup) => Ok(self.engine.current()? == backup.value),
            None => Ok(false),
        }
    }

    /// アカウントストアの情報を結合したバインディング一覧
    pub fn binding_views(&self) -> Vec<BindingView> {
        self.policy
            .bindings()
            .into_iter()
            .map(|(account_id, machine_id)| {
                let email = self
                    .accounts
                    .lookup_account(&account_id)
                    .and_then(|summary| summary.email);
                BindingView {
                    account_id,
                    email,
                    machine_id,
                }
            })
            .collect()
    }
}

impl MachineIdUseCase for MachineIdService<'_> {
    fn get_os_type(&self) -> OsType {
        self.engine.accessor().os_type()
    }

    fn check_admin(&self) -> bool {
        self.engine.accessor().check_admin()
    }

    fn request_admin_restart(&self, args: &[String]) -> Result<ElevatedLaunch, DomainError> {
        let accessor = self.engine.accessor();
        if !accessor.requires_elevation() || accessor.check_admin() {
            return Ok(ElevatedLaunch::NotRequired);
        }
        info!(os = accessor.os_type().as_str(), "requesting elevated restart");
        self.elevation.relaunch_elevated(args)
    }

    fn refresh_current(&self) -> Result<MachineId, DomainError> {
        self.engine.current()
    }

    fn change(&self, id: Option<MachineId>) -> Result<MutationReport, DomainError> {
        self.engine.change_to(id, HistoryAction::Manual)
    }

    fn restore_original(&self) -> Result<MutationReport, DomainError> {
        self.engine.restore_original()
    }

    fn backup_to_file(&self, path: &Path) -> Result<MachineId, DomainError> {
        let current = self.engine.current()?;
        self.engine.export_to_file(path, &current)?;
        info!(path = %path.display(), "machine identifier exported");
        Ok(current)
    }

    fn restore_from_file(&self, path: Option<&Path>) -> Result<ImportOutcome, DomainError> {
        let Some(path) = path else {
            return Ok(ImportOutcome::cancelled());
        };
        let id = self.engine.import_from_file(path)?;
        Ok(ImportOutcome::imported(id))
    }

    fn get_history(&self) -> Result<Vec<HistoryEntry>, DomainError> {
        self.engine.ledger().list_history()
    }

    fn clear_history(&self) -> Result<(), DomainError> {
        self.engine.ledger().clear_history()
    }

    fn get_bindings(&self) -> AccountBindings {
        self.policy.bindings()
    }
}
