//! 表示層向けの文言・整形ヘルパー

use chrono::{Local, TimeZone};
use mid_domain::DomainError;
use mid_domain::model::{HistoryAction, OsType};

/// エラー種別ごとの利用者向けメッセージ
pub fn describe_error(err: &DomainError) -> String {
    match err {
        DomainError::Permission(_) => format!(
            "{err}\nhint: run `mid elevate -- <command>` or start the tool from an elevated shell"
        ),
        DomainError::NoBackup => {
            format!("{err}\nhint: the original value is captured on the first change")
        }
        DomainError::Validation(_) => {
            format!("{err}\nhint: the identifier must be non-empty and contain no NUL characters")
        }
        _ => err.to_string(),
    }
}

pub fn action_label(action: HistoryAction) -> &'static str {
    match action {
        HistoryAction::Initial => "original",
        HistoryAction::Manual => "manual change",
        HistoryAction::AutoSwitch => "account switch",
        HistoryAction::Restore => "restored",
        HistoryAction::Bind => "bound to account",
    }
}

/// 書き込みに必要な権限の説明
pub fn platform_note(os: OsType) -> &'static str {
    match os {
        OsType::Windows => "Writes HKLM\\SOFTWARE\\Microsoft\\Cryptography\\MachineGuid; needs administrator rights",
        OsType::Linux => "Writes /etc/machine-id; needs root",
        OsType::MacOs => "Uses an application-level override; the hardware UUID is never changed",
        OsType::Unknown => "Machine identifier management is not supported on this platform",
    }
}

/// エポックミリ秒をローカル時刻で表示
pub fn format_timestamp(ms: u64) -> String {
    match i64::try_from(ms).ok().and_then(|ms| Local.timestamp_millis_opt(ms).single()) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}
