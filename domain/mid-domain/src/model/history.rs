use super::MachineId;

/// 履歴エントリの操作種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryAction {
    /// 初回変更時に取得した原本
    Initial,
    /// ユーザーによる手動変更
    Manual,
    /// アカウント切替に伴う自動変更
    AutoSwitch,
    /// 原本への復元
    Restore,
    /// アカウントへのバインド
    Bind,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::AutoSwitch => "auto_switch",
            Self::Restore => "restore",
            Self::Bind => "bind",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "initial" => Some(Self::Initial),
            "manual" => Some(Self::Manual),
            "auto_switch" => Some(Self::AutoSwitch),
            "restore" => Some(Self::Restore),
            "bind" => Some(Self::Bind),
            _ => None,
        }
    }
}

/// 管理開始前の原本識別子。一度だけ作成され、以後上書きされない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalBackup {
    pub value: MachineId,
    /// エポックからのミリ秒
    pub captured_at: u64,
}

/// 変更履歴の1件（追記専用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// エントリ固有のUUID
    pub id: String,
    pub machine_id: MachineId,
    pub action: HistoryAction,
    /// エポックからのミリ秒
    pub timestamp: u64,
}
