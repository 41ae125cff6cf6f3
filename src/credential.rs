//! Credential records and the provider-credential state machine

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::account::PaymentProvider;
use crate::error::StoreError;

/// Lifecycle of one provider integration attempt.
///
/// The enum is the single source of truth for "what state is this credential
/// in"; task progress is always derived from the record, never stored next
/// to it. `transition` is the only way the state ever changes.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    #[n(0)]
    Created,
    #[n(1)]
    Entered,
    #[n(2)]
    Verified,
    #[n(3)]
    Active,
    #[n(4)]
    Retired,
}

impl CredentialState {
    /// The legal edges. Everything else is rejected.
    pub fn can_transition_to(self, next: CredentialState) -> bool {
        use CredentialState::*;
        matches!(
            (self, next),
            (Created, Entered) | (Entered, Verified) | (Verified, Active) | (Active, Retired)
        )
    }

    /// A retired credential is read-only history and never reused.
    pub fn is_terminal(self) -> bool {
        matches!(self, CredentialState::Retired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialState::Created => "CREATED",
            CredentialState::Entered => "ENTERED",
            CredentialState::Verified => "VERIFIED",
            CredentialState::Active => "ACTIVE",
            CredentialState::Retired => "RETIRED",
        }
    }
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One provider integration attempt on a gateway account.
///
/// The field map is opaque here; its shape is owned by the provider value
/// objects which validate it before it is ever written.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct GatewayAccountCredential {
    #[n(0)]
    pub external_id: String,
    #[n(1)]
    pub payment_provider: PaymentProvider,
    #[n(2)]
    state: CredentialState,
    #[n(3)]
    pub fields: BTreeMap<String, String>,
    #[n(4)]
    pub fields_fingerprint: Option<String>, // hash of the last finalised field payload
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
    #[n(6)]
    pub last_updated_at: TimeStamp<Utc>,
    #[n(7)]
    pub last_updated_by: Option<String>,
}

impl GatewayAccountCredential {
    pub fn new(external_id: String, payment_provider: PaymentProvider) -> Self {
        let now = TimeStamp::new();
        Self {
            external_id,
            payment_provider,
            state: CredentialState::Created,
            fields: BTreeMap::new(),
            fields_fingerprint: None,
            created_at: now.clone(),
            last_updated_at: now,
            last_updated_by: None,
        }
    }

    pub fn state(&self) -> CredentialState {
        self.state
    }

    /// Apply one state machine edge. Rejects anything not in the legal set,
    /// so a credential can never be observed in a state it did not earn.
    pub fn transition(&mut self, to: CredentialState) -> Result<(), StoreError> {
        if !self.state.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.last_updated_at = TimeStamp::new();
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
