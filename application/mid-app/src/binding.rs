//! アカウント切替時の識別子バインディングポリシー。
//!
//! 同一アカウントへの同時切替に対して「参照→作成」を原子的にするため、
//! アカウントIDごとのロックを切替処理全体で保持する。

use crate::config::ConfigStore;
use mid_domain::DomainError;
use mid_domain::model::{
    AccountBindings, AccountId, HistoryAction, MachineId, MutationReport, validate_machine_id,
};
use mid_domain::port::driven::BindingRepository;
use mid_engine::{Ledger, MutationEngine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// 切替で行ったバインディング操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingChange {
    /// バインディング無効（毎回ランダム）
    None,
    /// 既存のバインド値を再適用
    Reused,
    /// 新しい値を適用してバインドを作成／更新
    Created,
}

/// アカウント切替イベントの処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// 自動切替が無効
    Skipped,
    Applied {
        report: MutationReport,
        binding: BindingChange,
    },
}

pub struct BindingPolicy<'a> {
    repo: &'a dyn BindingRepository,
    bindings: Mutex<AccountBindings>,
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl<'a> BindingPolicy<'a> {
    pub fn load(repo: &'a dyn BindingRepository) -> Result<Self, DomainError> {
        let bindings = repo.load_bindings()?;
        Ok(Self {
            repo,
            bindings: Mutex::new(bindings),
            account_locks: Mutex::new(HashMap::new()),
        })
    }

    /// 「アカウントが切り替わった」イベントの処理
    pub fn on_account_switched(
        &self,
        engine: &MutationEngine<'_>,
        config: &ConfigStore<'_>,
        account: &AccountId,
    ) -> Result<SwitchOutcome, DomainError> {
        let cfg = config.current();
        if !cfg.auto_switch_on_account_change {
            debug!(account = %account, "auto switch disabled; keeping machine identifier");
            return Ok(SwitchOutcome::Skipped);
        }
        if !cfg.bind_machine_id_to_account {
            let report = engine.change_to(None, HistoryAction::AutoSwitch)?;
            return Ok(SwitchOutcome::Applied {
                report,
                binding: BindingChange::None,
            });
        }

        let lock = self.account_lock(account);
        let _account_guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if cfg.use_binded_machine_id {
            if let Some(bound) = self.binding_for(account) {
                let report = engine.change_to(Some(bound), HistoryAction::AutoSwitch)?;
                return Ok(SwitchOutcome::Applied {
                    report,
                    binding: BindingChange::Reused,
                });
            }
        }

        let fresh = engine.generate();
        let report = engine.change_to(Some(fresh), HistoryAction::AutoSwitch)?;
        let report = self.bind_and_log(engine.ledger(), account, report);
        Ok(SwitchOutcome::Applied {
            report,
            binding: BindingChange::Created,
        })
    }

    /// ユーザーによる明示的な再バインド。識別子の適用はしない。
    ///
    /// 保存に失敗した場合は何も変わらないためエラーを返す。保存後の
    /// `bind` 履歴の追記失敗は劣化した成功として報告する。
    pub fn rebind(
        &self,
        ledger: &Ledger<'_>,
        account: &AccountId,
        machine_id: MachineId,
    ) -> Result<MutationReport, DomainError> {
        validate_machine_id(machine_id.as_str())?;
        let lock = self.account_lock(account);
        let _account_guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.store_binding(account, &machine_id)?;
        let report = MutationReport::new(machine_id);
        match ledger.append_history(report.machine_id(), HistoryAction::Bind) {
            Ok(_) => Ok(report),
            Err(err) => {
                warn!(error = %err, account = %account, "binding stored but bind entry was lost");
                Ok(report.with_history_error(Some(err)))
            }
        }
    }

    /// アカウント削除に伴いバインドを外す。存在しなければ何もしない。
    pub fn forget_account(&self, account: &AccountId) -> Result<bool, DomainError> {
        let removed = {
            let lock = self.account_lock(account);
            let _account_guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut bindings = self.lock_bindings();
            if bindings.contains_key(account) {
                let mut next = bindings.clone();
                next.remove(account);
                self.repo.save_bindings(&next)?;
                *bindings = next;
                info!(account = %account, "machine identifier binding removed");
                true
            } else {
                false
            }
        };
        self.prune_idle_locks();
        Ok(removed)
    }

    /// 全バインドを削除
    pub fn clear_bindings(&self) -> Result<(), DomainError> {
        {
            let mut bindings = self.lock_bindings();
            let empty = AccountBindings::new();
            self.repo.save_bindings(&empty)?;
            *bindings = empty;
        }
        self.prune_idle_locks();
        Ok(())
    }

    pub fn bindings(&self) -> AccountBindings {
        self.lock_bindings().clone()
    }

    pub fn binding_for(&self, account: &AccountId) -> Option<MachineId> {
        self.lock_bindings().get(account).cloned()
    }

    /// 識別子は適用済みなので、ここでの失敗はすべて劣化した成功として返す
    fn bind_and_log(
        &self,
        ledger: &Ledger<'_>,
        account: &AccountId,
        report: MutationReport,
    ) -> MutationReport {
        if let Err(err) = self.store_binding(account, report.machine_id()) {
            warn!(error = %err, account = %account, "identifier applied but binding was not stored");
            return report.with_binding_error(Some(err));
        }
        match ledger.append_history(report.machine_id(), HistoryAction::Bind) {
            Ok(_) => report,
            Err(err) => {
                warn!(error = %err, account = %account, "binding stored but bind entry was lost");
                if report.history_error().is_some() {
                    report
                } else {
                    report.with_history_error(Some(err))
                }
            }
        }
    }

    fn store_binding(&self, account: &AccountId, machine_id: &MachineId) -> Result<(), DomainError> {
        let mut bindings = self.lock_bindings();
        let mut next = bindings.clone();
        next.insert(account.clone(), machine_id.clone());
        self.repo.save_bindings(&next)?;
        *bindings = next;
        info!(account = %account, machine_id = %machine_id, "machine identifier bound to account");
        Ok(())
    }

    fn account_lock(&self, account: &AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.lock_account_locks();
        // マップだけが保持しているロックは誰も待っていないので捨ててよい
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(account.clone()).or_default().clone()
    }

    fn prune_idle_locks(&self) {
        self.lock_account_locks()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    fn lock_account_locks(&self) -> MutexGuard<'_, HashMap<AccountId, Arc<Mutex<()>>>> {
        self.account_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.lock_account_locks().len()
    }

    fn lock_bindings(&self) -> MutexGuard<'_, AccountBindings> {
        self.bindings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
