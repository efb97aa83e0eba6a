//! 自動化設定の唯一の所有者。
//!
//! 他のコンポーネントは設定をキャッシュせず、常にここから読む。

use mid_domain::DomainError;
use mid_domain::model::{ConfigPatch, MachineIdConfig};
use mid_domain::port::driven::ConfigRepository;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct ConfigStore<'a> {
    repo: &'a dyn ConfigRepository,
    current: Mutex<MachineIdConfig>,
}

impl<'a> ConfigStore<'a> {
    /// 起動時に一度だけ読み込む（未保存なら既定値）
    pub fn load(repo: &'a dyn ConfigRepository) -> Result<Self, DomainError> {
        let current = if repo.exists() {
            repo.load()?
        } else {
            MachineIdConfig::default()
        };
        Ok(Self {
            repo,
            current: Mutex::new(current),
        })
    }

    pub fn current(&self) -> MachineIdConfig {
        *self.lock()
    }

    /// 変更して即座に永続化する。保存に失敗した場合はメモリ上の値も変更しない。
    pub fn update(&self, patch: &ConfigPatch) -> Result<MachineIdConfig, DomainError> {
        let mut current = self.lock();
        let mut next = *current;
        next.apply(patch);
        if next == *current {
            return Ok(next);
        }
        self.repo.save(&next)?;
        *current = next;
        info!(
            auto_switch = next.auto_switch_on_account_change,
            bind = next.bind_machine_id_to_account,
            use_bound = next.use_binded_machine_id,
            "machine identifier settings updated"
        );
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, MachineIdConfig> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
