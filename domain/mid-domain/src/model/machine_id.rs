use crate::DomainError;
use std::fmt;

/// 機械識別子（OS が保持するデバイス指紋）。
///
/// UUID 形式を想定するが強制はしない。構造検証は空文字と NUL 文字の拒否のみ。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(String);

impl MachineId {
    /// ユーザー入力やインポートファイルから作成する。前後の空白は除去する。
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        validate_machine_id(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// OS から読み出した生の値を包む。検証せず、内容をそのまま保持する。
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// 正準 UUID 形式（8-4-4-4-12 の16進）か
    pub fn is_canonical_uuid(&self) -> bool {
        is_canonical_uuid(&self.0)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 書き込み前の構造検証
pub fn validate_machine_id(value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(
            "machine identifier must not be empty".into(),
        ));
    }
    if value.contains('\0') {
        return Err(DomainError::Validation(
            "machine identifier must not contain NUL characters".into(),
        ));
    }
    Ok(())
}

fn is_canonical_uuid(value: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = value.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS.iter())
            .all(|(part, len)| part.len() == *len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// アカウントストア側のアカウントキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw: String = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation("account id must not be empty".into()));
        }
        if trimmed.contains('\0') {
            return Err(DomainError::Validation(
                "account id must not contain NUL characters".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_accepts_non_uuid_values() {
        let id = MachineId::parse("  0123456789abcdef0123456789abcdef\n").unwrap();
        assert_eq!(id.as_str(), "0123456789abcdef0123456789abcdef");
        assert!(!id.is_canonical_uuid());
    }

    #[test]
    fn parse_rejects_empty_and_nul() {
        assert!(matches!(
            MachineId::parse("   "),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            MachineId::parse("abc\0def"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn from_raw_preserves_content() {
        let id = MachineId::from_raw(" raw value\n");
        assert_eq!(id.as_str(), " raw value\n");
    }

    #[test]
    fn canonical_uuid_detection() {
        let id = MachineId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        assert!(id.is_canonical_uuid());
        let id = MachineId::parse("11111111-1111-1111-1111-11111111111g").unwrap();
        assert!(!id.is_canonical_uuid());
    }

    #[test]
    fn account_id_rejects_blank() {
        assert!(AccountId::new("").is_err());
        assert_eq!(AccountId::new(" acc-1 ").unwrap().as_str(), "acc-1");
    }
}
