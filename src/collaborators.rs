//! Contracts for the external services the switch workflow drives
//!
//! The workflow core only depends on these traits. In production they are
//! backed by the account-data and payment-processing services; in tests by
//! the sled store and a scripted payments double.

use std::fmt;

use crate::credential::{CredentialState, GatewayAccountCredential};
use crate::account::GatewayAccount;
use crate::error::{PaymentsError, StoreError};
use crate::provider::FinalisedFields;

/// The account-data service: sole writer of durable credential state.
/// Transitions are requested with the expected current state and applied
/// compare-and-set, so a stale caller gets a precondition failure instead
/// of silently clobbering a concurrent change.
pub trait AccountsService: Send + Sync {
    fn get_account(&self, account_id: &str) -> Result<GatewayAccount, StoreError>;

    fn get_credential(
        &self,
        account_id: &str,
        credential_id: &str,
    ) -> Result<GatewayAccountCredential, StoreError>;

    /// Write a validated field payload onto the credential. Moves a fresh
    /// credential to `Entered`; rejects credentials past `Entered`.
    fn update_credential_fields(
        &self,
        account_id: &str,
        credential_id: &str,
        finalised: FinalisedFields,
        updated_by: &str,
    ) -> Result<GatewayAccountCredential, StoreError>;

    fn transition_credential_state(
        &self,
        account_id: &str,
        credential_id: &str,
        from: CredentialState,
        to: CredentialState,
    ) -> Result<GatewayAccountCredential, StoreError>;

    /// Atomic promote+retire: the new credential becomes the account's live
    /// one and the previous live one (if any) is retired in the same write.
    fn promote_to_active(&self, account_id: &str, credential_id: &str) -> Result<(), StoreError>;
}

/// A charge created for the verification payment round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCharge {
    pub charge_external_id: String,
    /// Provider-hosted payment page the user is sent to.
    pub redirect_url: String,
}

/// Terminal charge outcomes as reported by the payment-processing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    Cancelled,
    Expired,
}

impl ChargeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ChargeStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Success => "success",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Cancelled => "cancelled",
            ChargeStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The payment-processing service. `create_charge` is explicitly scoped to
/// one credential so the verification payment exercises the candidate, not
/// whatever credential happens to be live.
pub trait PaymentsService: Send + Sync {
    fn create_charge(
        &self,
        account_id: &str,
        credential_id: &str,
        amount_minor_units: u64,
        return_url: &str,
    ) -> Result<CreatedCharge, PaymentsError>;

    fn get_charge(&self, account_id: &str, charge_id: &str) -> Result<ChargeStatus, PaymentsError>;
}

/// Opaque key/value storage scoped to one user's browser session. Only used
/// to stash the verification charge correlation between Start and Resume.
/// Any implementation with set/get/remove-once semantics will do.
pub trait SessionStore {
    fn set(&mut self, key: &str, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&mut self, key: &str) -> Option<String>;
}
