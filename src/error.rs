//! Error taxonomy for the credential store and the onboarding task surface

use crate::account::PaymentProvider;
use crate::credential::CredentialState;
use crate::tasks::TaskId;

/// Failures raised by the account-data contract and its sled implementation.
///
/// `PreconditionFailed` and `IllegalTransition` are contract violations: the
/// guard or the verification protocol let a request through that should have
/// been stopped earlier. They are logged at error severity and must never be
/// shown to users as anything but a generic internal failure.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("gateway account not found: {0}")]
    AccountNotFound(String),
    #[error("credential not found on account: {0}")]
    CredentialNotFound(String),
    #[error("credential is {actual}, operation requires {expected}")]
    PreconditionFailed {
        expected: CredentialState,
        actual: CredentialState,
    },
    #[error("illegal credential state transition {from} -> {to}")]
    IllegalTransition {
        from: CredentialState,
        to: CredentialState,
    },
    #[error("account {0} has more than one active credential")]
    ActiveConflict(String),
    #[error("storage backend failure")]
    Backend(#[from] sled::Error),
    #[error("failed to encode record")]
    Encode(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("failed to decode record")]
    Decode(#[from] minicbor::decode::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("task {task} is not part of the {provider} onboarding journey")]
    UnknownTask {
        task: TaskId,
        provider: PaymentProvider,
    },
    #[error("account has no credential to switch to")]
    NoSwitchingCredential,
}

/// Raised while validating provider credential forms, before anything is
/// written to the credential record.
#[derive(thiserror::Error, Debug)]
pub enum FieldError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum PaymentsError {
    #[error("charge not found: {0}")]
    ChargeNotFound(String),
    #[error("payment service failure: {0}")]
    Unavailable(String),
}
