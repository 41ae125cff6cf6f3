//! Provider-specific credential field shapes
//!
//! The state machine and task model treat credential fields as an opaque
//! map. These value objects give each provider's form a typed shape and a
//! validation step; `validate_and_finalise` returns the field map together
//! with a hash of its CBOR encoding, which the store keeps as an immutable
//! audit copy of what was linked.

use std::collections::BTreeMap;

use crate::error::FieldError;

pub mod field_names {
    // worldpay account credentials
    pub const MERCHANT_CODE: &str = "merchant_code";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    // worldpay 3ds flex credentials
    pub const ISSUER: &str = "issuer";
    pub const ORGANISATIONAL_UNIT_ID: &str = "organisational_unit_id";
    pub const JWT_MAC_KEY: &str = "jwt_mac_key";
    // stripe
    pub const STRIPE_ACCOUNT_ID: &str = "stripe_account_id";
    pub const API_TOKEN: &str = "api_token";
}

/// A validated provider field payload, ready for the store. The fingerprint
/// is the hash of the CBOR encoding, used as the key of the audit copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalisedFields {
    pub fingerprint: String,
    pub payload: Vec<u8>,
    pub fields: BTreeMap<String, String>,
}

fn required(name: &'static str, value: &Option<String>) -> Result<String, FieldError> {
    match value {
        None => Err(FieldError::Missing(name)),
        Some(v) if v.trim().is_empty() => Err(FieldError::Empty(name)),
        Some(v) => Ok(v.clone()),
    }
}

fn finalise<T: minicbor::Encode<()>>(
    value: &T,
    fields: BTreeMap<String, String>,
) -> anyhow::Result<FinalisedFields> {
    let payload = minicbor::to_vec(value)?;
    let fingerprint = sha256::digest(&payload);

    Ok(FinalisedFields {
        fingerprint,
        payload,
        fields,
    })
}

// Also used for constructing drafts from the form handler's raw input
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Eq, PartialEq)]
pub struct WorldpayCredentialFields {
    #[n(0)]
    merchant_code: Option<String>,
    #[n(1)]
    username: Option<String>,
    #[n(2)]
    password: Option<String>,
}

impl WorldpayCredentialFields {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_merchant_code(mut self, merchant_code: &str) -> Self {
        self.merchant_code = Some(merchant_code.to_owned());
        self
    }
    pub fn set_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_owned());
        self
    }
    pub fn set_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_owned());
        self
    }

    /// Checks every field is present and non-empty, then serialises.
    pub fn validate_and_finalise(&self) -> anyhow::Result<FinalisedFields> {
        let merchant_code = required(field_names::MERCHANT_CODE, &self.merchant_code)?;
        let username = required(field_names::USERNAME, &self.username)?;
        let password = required(field_names::PASSWORD, &self.password)?;

        let mut fields = BTreeMap::new();
        fields.insert(field_names::MERCHANT_CODE.to_owned(), merchant_code);
        fields.insert(field_names::USERNAME.to_owned(), username);
        fields.insert(field_names::PASSWORD.to_owned(), password);

        finalise(self, fields)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Eq, PartialEq)]
pub struct WorldpayFlexCredentialFields {
    #[n(0)]
    issuer: Option<String>,
    #[n(1)]
    organisational_unit_id: Option<String>,
    #[n(2)]
    jwt_mac_key: Option<String>,
}

impl WorldpayFlexCredentialFields {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_issuer(mut self, issuer: &str) -> Self {
        self.issuer = Some(issuer.to_owned());
        self
    }
    pub fn set_organisational_unit_id(mut self, organisational_unit_id: &str) -> Self {
        self.organisational_unit_id = Some(organisational_unit_id.to_owned());
        self
    }
    pub fn set_jwt_mac_key(mut self, jwt_mac_key: &str) -> Self {
        self.jwt_mac_key = Some(jwt_mac_key.to_owned());
        self
    }

    pub fn validate_and_finalise(&self) -> anyhow::Result<FinalisedFields> {
        let issuer = required(field_names::ISSUER, &self.issuer)?;
        let organisational_unit_id = required(
            field_names::ORGANISATIONAL_UNIT_ID,
            &self.organisational_unit_id,
        )?;
        let jwt_mac_key = required(field_names::JWT_MAC_KEY, &self.jwt_mac_key)?;

        let mut fields = BTreeMap::new();
        fields.insert(field_names::ISSUER.to_owned(), issuer);
        fields.insert(
            field_names::ORGANISATIONAL_UNIT_ID.to_owned(),
            organisational_unit_id,
        );
        fields.insert(field_names::JWT_MAC_KEY.to_owned(), jwt_mac_key);

        finalise(self, fields)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Eq, PartialEq)]
pub struct StripeCredentialFields {
    #[n(0)]
    stripe_account_id: Option<String>,
    #[n(1)]
    api_token: Option<String>,
}

impl StripeCredentialFields {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_stripe_account_id(mut self, stripe_account_id: &str) -> Self {
        self.stripe_account_id = Some(stripe_account_id.to_owned());
        self
    }
    pub fn set_api_token(mut self, api_token: &str) -> Self {
        self.api_token = Some(api_token.to_owned());
        self
    }

    pub fn validate_and_finalise(&self) -> anyhow::Result<FinalisedFields> {
        let stripe_account_id = required(field_names::STRIPE_ACCOUNT_ID, &self.stripe_account_id)?;
        let api_token = required(field_names::API_TOKEN, &self.api_token)?;

        let mut fields = BTreeMap::new();
        fields.insert(field_names::STRIPE_ACCOUNT_ID.to_owned(), stripe_account_id);
        fields.insert(field_names::API_TOKEN.to_owned(), api_token);

        finalise(self, fields)
    }
}
