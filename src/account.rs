//! Gateway account model

use std::fmt;

use crate::credential::{CredentialState, GatewayAccountCredential};
use crate::error::StoreError;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    #[n(0)]
    Test,
    #[n(1)]
    Live,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentProvider {
    #[n(0)]
    Worldpay,
    #[n(1)]
    Stripe,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Worldpay => "worldpay",
            PaymentProvider::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which payment methods the account may take.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentMethods {
    #[n(0)]
    pub card: bool,
    #[n(1)]
    pub direct_debit: bool,
}

impl PaymentMethods {
    pub fn card_only() -> Self {
        Self {
            card: true,
            direct_debit: false,
        }
    }
}

/// A merchant's payment configuration. Owns its credentials exclusively;
/// a credential belongs to exactly one account and is never shared.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct GatewayAccount {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub external_id: String,
    #[n(2)]
    pub account_type: AccountType,
    #[n(3)]
    pub payment_methods: PaymentMethods,
    #[n(4)]
    pub provider_switch_enabled: bool,
    #[n(5)]
    pub credentials: Vec<GatewayAccountCredential>,
}

impl GatewayAccount {
    pub fn new(
        id: u64,
        external_id: String,
        account_type: AccountType,
        payment_methods: PaymentMethods,
        provider_switch_enabled: bool,
    ) -> Self {
        Self {
            id,
            external_id,
            account_type,
            payment_methods,
            provider_switch_enabled,
            credentials: vec![],
        }
    }

    pub fn credential(&self, external_id: &str) -> Option<&GatewayAccountCredential> {
        self.credentials.iter().find(|c| c.external_id == external_id)
    }

    pub fn credential_mut(&mut self, external_id: &str) -> Option<&mut GatewayAccountCredential> {
        self.credentials
            .iter_mut()
            .find(|c| c.external_id == external_id)
    }

    /// The credential currently processing live payments, if any.
    pub fn active_credential(&self) -> Option<&GatewayAccountCredential> {
        self.credentials
            .iter()
            .find(|c| c.state() == CredentialState::Active)
    }

    /// The credential the account is in the middle of switching to: the
    /// latest one that is neither live nor retired.
    pub fn switching_candidate(&self) -> Option<&GatewayAccountCredential> {
        self.credentials
            .iter()
            .rev()
            .find(|c| !matches!(c.state(), CredentialState::Active | CredentialState::Retired))
    }

    /// Same as [`switching_candidate`](Self::switching_candidate) but pinned
    /// to one provider, for task derivation.
    pub fn switching_candidate_for(
        &self,
        provider: PaymentProvider,
    ) -> Option<&GatewayAccountCredential> {
        self.credentials.iter().rev().find(|c| {
            c.payment_provider == provider
                && !matches!(c.state(), CredentialState::Active | CredentialState::Retired)
        })
    }

    /// Promote a verified credential to live use, retiring whichever
    /// credential held that spot. The whole account record is written back
    /// in one piece, so the caller observes promote+retire as one step.
    pub fn promote_credential(&mut self, credential_id: &str) -> Result<(), StoreError> {
        let target_state = self
            .credential(credential_id)
            .ok_or_else(|| StoreError::CredentialNotFound(credential_id.to_owned()))?
            .state();

        if target_state != CredentialState::Verified {
            return Err(StoreError::PreconditionFailed {
                expected: CredentialState::Verified,
                actual: target_state,
            });
        }

        // retire the outgoing credential first, then bring the target up.
        // the target cannot be in the retire sweep, it is Verified.
        for cred in self.credentials.iter_mut() {
            if cred.state() == CredentialState::Active {
                cred.transition(CredentialState::Retired)?;
            }
        }
        for cred in self.credentials.iter_mut() {
            if cred.external_id == credential_id {
                cred.transition(CredentialState::Active)?;
            }
        }

        Ok(())
    }
}
