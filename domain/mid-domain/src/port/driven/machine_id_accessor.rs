//! プラットフォーム識別子アクセスポート

use crate::error::DomainError;
use crate::model::{MachineId, OsType};

/// OS ネイティブの機械識別子を読み書きする能力
///
/// - Windows: レジストリの MachineGuid
/// - Linux: /etc/machine-id
/// - macOS: アプリ層の上書き値（ハードウェア UUID には触れない）
pub trait MachineIdAccessor: Send + Sync {
    fn os_type(&self) -> OsType;

    /// 現在の識別子を読み出す。失敗は `DomainError::Access`
    fn read_current(&self) -> Result<MachineId, DomainError>;

    /// 新しい識別子を原子的に書き込む（完全に新値か、変更なしのどちらか）
    fn write_new(&self, id: &MachineId) -> Result<(), DomainError>;

    /// 現在のプロセスが書き込みに必要な権限を持つか
    fn check_admin(&self) -> bool;

    /// 書き込みに昇格が必要なプラットフォームか
    fn requires_elevation(&self) -> bool {
        self.os_type().requires_elevation()
    }
}
