//! Sled-backed credential store
//!
//! Reference implementation of the account-data contract. An account and
//! its credential set live in one CBOR record, so every multi-credential
//! change (promote+retire in particular) lands in a single atomic write.
//! Finalised field payloads are additionally stored immutably under their
//! fingerprint, keeping an audit copy of exactly what was linked.

use std::sync::Arc;

use sled::Batch;
use tracing::{error, info};

use crate::account::{AccountType, GatewayAccount, PaymentMethods, PaymentProvider};
use crate::collaborators::AccountsService;
use crate::credential::{CredentialState, GatewayAccountCredential, TimeStamp};
use crate::error::StoreError;
use crate::provider::FinalisedFields;
use crate::utils;

pub struct CredentialStore {
    instance: Arc<sled::Db>,
}

impl CredentialStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    fn load_account(&self, account_id: &str) -> Result<GatewayAccount, StoreError> {
        let bytes = self
            .instance
            .get(account_id.as_bytes())?
            .ok_or_else(|| StoreError::AccountNotFound(account_id.to_owned()))?;
        let account: GatewayAccount = minicbor::decode(&bytes)?;

        // two live credentials means a past write was torn. refuse to touch
        // the record rather than guess which one is real.
        let active = account
            .credentials
            .iter()
            .filter(|c| c.state() == CredentialState::Active)
            .count();
        if active > 1 {
            error!(account = account_id, "account record holds {active} active credentials");
            return Err(StoreError::ActiveConflict(account_id.to_owned()));
        }

        Ok(account)
    }

    fn save_account(&self, account: &GatewayAccount) -> Result<(), StoreError> {
        self.instance
            .insert(account.external_id.as_bytes(), minicbor::to_vec(account)?)?;
        Ok(())
    }

    /// Seed a new gateway account record.
    pub fn create_account(
        &self,
        account_type: AccountType,
        payment_methods: PaymentMethods,
        provider_switch_enabled: bool,
    ) -> anyhow::Result<GatewayAccount> {
        let id = self.instance.generate_id()?;
        let external_id = utils::new_account_id()?;

        let account = GatewayAccount::new(
            id,
            external_id,
            account_type,
            payment_methods,
            provider_switch_enabled,
        );
        self.save_account(&account)?;

        info!(account = %account.external_id, "gateway account created");
        Ok(account)
    }

    /// Open a new provider integration attempt on the account. The
    /// credential starts in `Created` with no fields.
    pub fn create_credential(
        &self,
        account_id: &str,
        provider: PaymentProvider,
    ) -> anyhow::Result<GatewayAccountCredential> {
        let mut account = self.load_account(account_id)?;

        let credential =
            GatewayAccountCredential::new(utils::new_credential_id()?, provider);
        account.credentials.push(credential.clone());
        self.save_account(&account)?;

        info!(
            account = account_id,
            credential = %credential.external_id,
            provider = %provider,
            "credential created"
        );
        Ok(credential)
    }
}

impl AccountsService for CredentialStore {
    fn get_account(&self, account_id: &str) -> Result<GatewayAccount, StoreError> {
        self.load_account(account_id)
    }

    fn get_credential(
        &self,
        account_id: &str,
        credential_id: &str,
    ) -> Result<GatewayAccountCredential, StoreError> {
        let account = self.load_account(account_id)?;
        account
            .credential(credential_id)
            .cloned()
            .ok_or_else(|| StoreError::CredentialNotFound(credential_id.to_owned()))
    }

    fn update_credential_fields(
        &self,
        account_id: &str,
        credential_id: &str,
        finalised: FinalisedFields,
        updated_by: &str,
    ) -> Result<GatewayAccountCredential, StoreError> {
        let mut account = self.load_account(account_id)?;
        let credential = account
            .credential_mut(credential_id)
            .ok_or_else(|| StoreError::CredentialNotFound(credential_id.to_owned()))?;

        // fields may only change while the credential is being set up.
        // editing a verified or live credential would invalidate the
        // verification the switch relies on.
        match credential.state() {
            CredentialState::Created => credential.transition(CredentialState::Entered)?,
            CredentialState::Entered => {}
            actual => {
                error!(
                    account = account_id,
                    credential = credential_id,
                    state = %actual,
                    "field update on a credential past setup"
                );
                return Err(StoreError::PreconditionFailed {
                    expected: CredentialState::Entered,
                    actual,
                });
            }
        }

        credential.fields.extend(finalised.fields.clone());
        credential.fields_fingerprint = Some(finalised.fingerprint.clone());
        credential.last_updated_at = TimeStamp::new();
        credential.last_updated_by = Some(updated_by.to_owned());
        let snapshot = credential.clone();

        // audit payload and account record land together
        let mut batch = Batch::default();
        batch.insert(finalised.fingerprint.as_bytes(), finalised.payload);
        batch.insert(
            account.external_id.as_bytes(),
            minicbor::to_vec(&account)?,
        );
        self.instance.apply_batch(batch)?;

        info!(
            account = account_id,
            credential = credential_id,
            state = %snapshot.state(),
            "provider fields linked"
        );
        Ok(snapshot)
    }

    fn transition_credential_state(
        &self,
        account_id: &str,
        credential_id: &str,
        from: CredentialState,
        to: CredentialState,
    ) -> Result<GatewayAccountCredential, StoreError> {
        let mut account = self.load_account(account_id)?;
        let credential = account
            .credential_mut(credential_id)
            .ok_or_else(|| StoreError::CredentialNotFound(credential_id.to_owned()))?;

        if credential.state() != from {
            error!(
                account = account_id,
                credential = credential_id,
                expected = %from,
                actual = %credential.state(),
                "state transition requested from a stale state"
            );
            return Err(StoreError::PreconditionFailed {
                expected: from,
                actual: credential.state(),
            });
        }

        credential.transition(to)?;
        let snapshot = credential.clone();
        self.save_account(&account)?;

        info!(
            account = account_id,
            credential = credential_id,
            from = %from,
            to = %to,
            "credential state transition"
        );
        Ok(snapshot)
    }

    fn promote_to_active(&self, account_id: &str, credential_id: &str) -> Result<(), StoreError> {
        let mut account = self.load_account(account_id)?;
        let outgoing = account
            .active_credential()
            .map(|c| c.external_id.clone());

        if let Err(err) = account.promote_credential(credential_id) {
            error!(
                account = account_id,
                credential = credential_id,
                %err,
                "promote rejected"
            );
            return Err(err);
        }
        self.save_account(&account)?;

        info!(
            account = account_id,
            credential = credential_id,
            retired = outgoing.as_deref().unwrap_or("none"),
            "credential promoted to active"
        );
        Ok(())
    }
}
