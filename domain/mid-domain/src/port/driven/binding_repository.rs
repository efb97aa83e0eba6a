//! アカウントバインディング永続化ポート

use crate::error::DomainError;
use crate::model::AccountBindings;

pub trait BindingRepository: Send + Sync {
    fn load_bindings(&self) -> Result<AccountBindings, DomainError>;

    fn save_bindings(&self, bindings: &AccountBindings) -> Result<(), DomainError>;
}
