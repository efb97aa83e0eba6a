/// 機械識別子の自動化設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineIdConfig {
    /// アカウント切替時に識別子を自動で変更する
    pub auto_switch_on_account_change: bool,
    /// アカウントごとに識別子をバインドする
    pub bind_machine_id_to_account: bool,
    /// バインド済みの識別子を再利用する（false なら毎回新規生成）
    pub use_binded_machine_id: bool,
}

impl MachineIdConfig {
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(v) = patch.auto_switch_on_account_change {
            self.auto_switch_on_account_change = v;
        }
        if let Some(v) = patch.bind_machine_id_to_account {
            self.bind_machine_id_to_account = v;
        }
        if let Some(v) = patch.use_binded_machine_id {
            self.use_binded_machine_id = v;
        }
    }
}

/// 部分更新（None の項目は変更しない）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub auto_switch_on_account_change: Option<bool>,
    pub bind_machine_id_to_account: Option<bool>,
    pub use_binded_machine_id: Option<bool>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.auto_switch_on_account_change.is_none()
            && self.bind_machine_id_to_account.is_none()
            && self.use_binded_machine_id.is_none()
    }
}
