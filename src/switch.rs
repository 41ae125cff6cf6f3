//! Switch-verification protocol
//!
//! Proves a candidate credential actually works by routing one real,
//! small-value payment through it before it may become the account's live
//! credential. Start and Resume are independent, stateless request
//! handlers; the only thing tying them together is the charge id stashed
//! in the caller's browser-session store.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::account::PaymentProvider;
use crate::collaborators::{AccountsService, ChargeStatus, PaymentsService, SessionStore};
use crate::credential::{CredentialState, GatewayAccountCredential};
use crate::error::{StoreError, TaskError};
use crate::guard::{self, TaskAccess};
use crate::provider::FinalisedFields;
use crate::tasks::{self, SetupTask, TaskId};

/// Session key under which the in-flight verification charge id lives.
pub const VERIFICATION_SESSION_KEY: &str = "switch.verification.charge";

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Size of the verification payment. Small and real: several provider
    /// field mistakes only surface at actual authorisation time.
    pub verification_amount_minor_units: u64,
    /// Where the provider sends the user back to after payment.
    pub return_url: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            verification_amount_minor_units: 200,
            return_url: "/switch-psp/verify/callback".to_owned(),
        }
    }
}

/// What Resume found. All three are ordinary outcomes the caller routes on,
/// never booleans and never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The charge succeeded and the credential moved to `Verified`.
    Verified(GatewayAccountCredential),
    /// The charge ended in a non-success state. The credential is untouched
    /// and verification may be retried from scratch.
    Declined(ChargeStatus),
    /// No correlation for this session. Session expiry, a stale bookmark,
    /// or a replayed callback; recoverable by starting verification again.
    LostCorrelation,
}

pub struct SwitchService {
    accounts: Arc<dyn AccountsService>,
    payments: Arc<dyn PaymentsService>,
    config: VerificationConfig,
}

impl SwitchService {
    pub fn new(accounts: Arc<dyn AccountsService>, payments: Arc<dyn PaymentsService>) -> Self {
        Self::with_config(accounts, payments, VerificationConfig::default())
    }

    pub fn with_config(
        accounts: Arc<dyn AccountsService>,
        payments: Arc<dyn PaymentsService>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            accounts,
            payments,
            config,
        }
    }

    fn switching_candidate(&self, account_id: &str) -> anyhow::Result<GatewayAccountCredential> {
        let account = self.accounts.get_account(account_id)?;
        let candidate = account
            .switching_candidate()
            .cloned()
            .ok_or(TaskError::NoSwitchingCredential)?;
        Ok(candidate)
    }

    /// Create the verification charge against the candidate credential and
    /// hand back the provider redirect. The charge id is written into the
    /// session; if the user double-submits, the last write wins and the
    /// earlier charge is simply never resolved (one orphaned test charge,
    /// no state damage).
    pub fn start_verification(
        &self,
        session: &mut dyn SessionStore,
        account_id: &str,
    ) -> anyhow::Result<String> {
        let candidate = self.switching_candidate(account_id)?;

        // verification pays through fields the user already entered; a bare
        // credential here means the guard upstream was bypassed
        if candidate.state() == CredentialState::Created {
            error!(
                account = account_id,
                credential = %candidate.external_id,
                "verification started on a credential with no fields"
            );
            return Err(StoreError::PreconditionFailed {
                expected: CredentialState::Entered,
                actual: CredentialState::Created,
            }
            .into());
        }

        let charge = self.payments.create_charge(
            account_id,
            &candidate.external_id,
            self.config.verification_amount_minor_units,
            &self.config.return_url,
        )?;
        session.set(VERIFICATION_SESSION_KEY, charge.charge_external_id.clone());

        info!(
            account = account_id,
            credential = %candidate.external_id,
            charge = %charge.charge_external_id,
            "verification payment created"
        );
        Ok(charge.redirect_url)
    }

    /// Handle the provider's redirect back. The correlation is taken out of
    /// the session before anything is resolved, so it is consumed exactly
    /// once: refreshing the callback URL after resolution yields
    /// `LostCorrelation` instead of replaying a state transition.
    pub fn resume_verification(
        &self,
        session: &mut dyn SessionStore,
        account_id: &str,
    ) -> anyhow::Result<VerificationOutcome> {
        let Some(charge_id) = session.remove(VERIFICATION_SESSION_KEY) else {
            warn!(account = account_id, "verification callback with no stored correlation");
            return Ok(VerificationOutcome::LostCorrelation);
        };

        let status = self.payments.get_charge(account_id, &charge_id)?;
        if !status.is_success() {
            info!(
                account = account_id,
                charge = %charge_id,
                status = %status,
                "verification payment did not succeed"
            );
            return Ok(VerificationOutcome::Declined(status));
        }

        let candidate = self.switching_candidate(account_id)?;
        let verified = self.accounts.transition_credential_state(
            account_id,
            &candidate.external_id,
            CredentialState::Entered,
            CredentialState::Verified,
        )?;

        info!(
            account = account_id,
            credential = %verified.external_id,
            "credential verified by live payment"
        );
        Ok(VerificationOutcome::Verified(verified))
    }

    /// Make the verified credential the account's live one. Only legal from
    /// `Verified`; the store applies promote and retire as one write.
    pub fn promote_credential(&self, account_id: &str, credential_id: &str) -> anyhow::Result<()> {
        self.accounts.promote_to_active(account_id, credential_id)?;
        Ok(())
    }

    /// The ordered onboarding task list, re-derived from the account record.
    pub fn onboarding_tasks(
        &self,
        account_id: &str,
        provider: PaymentProvider,
    ) -> anyhow::Result<Vec<SetupTask>> {
        let account = self.accounts.get_account(account_id)?;
        Ok(tasks::compute_tasks(&account, provider))
    }

    /// Request-time gate for one onboarding step.
    pub fn guard_task_access(
        &self,
        account_id: &str,
        provider: PaymentProvider,
        task_id: TaskId,
    ) -> anyhow::Result<TaskAccess> {
        let account = self.accounts.get_account(account_id)?;
        Ok(guard::guard_task_access(&account, provider, task_id)?)
    }

    /// Write a validated provider form onto the switching credential.
    pub fn submit_provider_fields(
        &self,
        account_id: &str,
        credential_id: &str,
        finalised: FinalisedFields,
        user: &str,
    ) -> anyhow::Result<GatewayAccountCredential> {
        let credential =
            self.accounts
                .update_credential_fields(account_id, credential_id, finalised, user)?;
        Ok(credential)
    }

    /// True once every mandatory task is complete and the candidate has
    /// passed verification, i.e. the switch page may offer the final
    /// promote action.
    pub fn switch_ready(
        &self,
        account_id: &str,
        provider: PaymentProvider,
    ) -> anyhow::Result<bool> {
        let account = self.accounts.get_account(account_id)?;
        let computed = tasks::compute_tasks(&account, provider);
        let verified = account
            .switching_candidate_for(provider)
            .is_some_and(|c| c.state() == CredentialState::Verified);

        Ok(verified && !tasks::has_incomplete_tasks(&computed))
    }
}
