use super::MachineId;
use crate::DomainError;

/// 識別子変更（またはバインド）の結果
///
/// 書き込み自体は成功したが履歴の追記に失敗した場合は `history_error`、
/// バインディングの保存に失敗した場合は `binding_error` に残す
/// （書き込みはロールバックしない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    machine_id: MachineId,
    history_error: Option<DomainError>,
    binding_error: Option<DomainError>,
}

impl MutationReport {
    pub fn new(machine_id: MachineId) -> Self {
        Self {
            machine_id,
            history_error: None,
            binding_error: None,
        }
    }

    pub fn with_history_error(mut self, error: Option<DomainError>) -> Self {
        self.history_error = error;
        self
    }

    pub fn with_binding_error(mut self, error: Option<DomainError>) -> Self {
        self.binding_error = error;
        self
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    pub fn into_machine_id(self) -> MachineId {
        self.machine_id
    }

    pub fn history_error(&self) -> Option<&DomainError> {
        self.history_error.as_ref()
    }

    pub fn binding_error(&self) -> Option<&DomainError> {
        self.binding_error.as_ref()
    }

    /// 履歴またはバインドを残せなかった（劣化した成功）か
    pub fn is_degraded(&self) -> bool {
        self.history_error.is_some() || self.binding_error.is_some()
    }
}

/// 昇格再起動要求の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevatedLaunch {
    /// 昇格不要（macOS、または既に昇格済み）
    NotRequired,
    /// 昇格したインスタンスを起動した。呼び出し側はこのプロセスを終了する
    Relaunched { exit_code: Option<i32> },
}

/// ファイルからのインポート結果（適用はしない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub success: bool,
    pub machine_id: Option<MachineId>,
}

impl ImportOutcome {
    pub fn imported(machine_id: MachineId) -> Self {
        Self {
            success: true,
            machine_id: Some(machine_id),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            machine_id: None,
        }
    }
}
