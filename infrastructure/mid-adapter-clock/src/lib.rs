//! 時刻・識別子生成アダプター
use mid_domain::model::MachineId;
use mid_domain::port::driven::{Clock, IdGenerator};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ClockAdapter;

impl ClockAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for ClockAdapter {
    fn now_ms(&self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        now.as_millis() as u64
    }
}

impl IdGenerator for ClockAdapter {
    /// OS の CSPRNG を使う v4 UUID（小文字のハイフン区切り）
    fn new_machine_id(&self) -> MachineId {
        MachineId::from_raw(Uuid::new_v4().hyphenated().to_string())
    }

    fn new_entry_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
