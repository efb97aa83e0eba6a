//! 機械識別子管理のユースケースポート

use crate::error::DomainError;
use crate::model::{
    AccountBindings, ElevatedLaunch, HistoryEntry, ImportOutcome, MachineId, MutationReport,
    OsType,
};
use std::path::Path;

/// 表示層に公開する操作一式
pub trait MachineIdUseCase {
    fn get_os_type(&self) -> OsType;

    fn check_admin(&self) -> bool;

    /// 昇格したインスタンスを起動する（成功時、呼び出し側は終了する）
    fn request_admin_restart(&self, args: &[String]) -> Result<ElevatedLaunch, DomainError>;

    /// 現在の識別子を OS から読み直す
    fn refresh_current(&self) -> Result<MachineId, DomainError>;

    /// 手動変更。`id` 省略時はランダム生成
    fn change(&self, id: Option<MachineId>) -> Result<MutationReport, DomainError>;

    fn restore_original(&self) -> Result<MutationReport, DomainError>;

    /// 現在の識別子をファイルへ書き出す
    fn backup_to_file(&self, path: &Path) -> Result<MachineId, DomainError>;

    /// ファイルから識別子を読み込む（適用はしない）。`None` はファイル選択のキャンセル
    fn restore_from_file(&self, path: Option<&Path>) -> Result<ImportOutcome, DomainError>;

    /// 変更履歴（古い順）
    fn get_history(&self) -> Result<Vec<HistoryEntry>, DomainError>;

    fn clear_history(&self) -> Result<(), DomainError>;

    fn get_bindings(&self) -> AccountBindings;
}
