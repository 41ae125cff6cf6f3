//! Utility functions for minting external identifiers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a fresh uuid then encode using bech32 under the given prefix
pub fn new_external_id(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// External id for a gateway account
pub fn new_account_id() -> anyhow::Result<String> {
    new_external_id("acct_")
}

/// External id for a gateway account credential
pub fn new_credential_id() -> anyhow::Result<String> {
    new_external_id("cred_")
}
