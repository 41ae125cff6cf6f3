//! Property-based tests for the credential state machine
//!
//! These tests use proptest to verify the transition rules and the promote
//! operation across a wide variety of state sequences. The invariant that
//! matters most is "at most one active credential per account": it must
//! hold after every sequence of promote attempts, including nonsense ones.

use proptest::prelude::*;

use psp_switch::account::{AccountType, GatewayAccount, PaymentMethods, PaymentProvider};
use psp_switch::credential::{CredentialState, GatewayAccountCredential};

fn state_strategy() -> impl Strategy<Value = CredentialState> {
    prop_oneof![
        Just(CredentialState::Created),
        Just(CredentialState::Entered),
        Just(CredentialState::Verified),
        Just(CredentialState::Active),
        Just(CredentialState::Retired),
    ]
}

/// Walk a fresh credential to the target state along legal edges only.
fn credential_in(id: &str, state: CredentialState) -> GatewayAccountCredential {
    use CredentialState::*;

    let mut cred = GatewayAccountCredential::new(id.to_owned(), PaymentProvider::Worldpay);
    let path: &[CredentialState] = match state {
        Created => &[],
        Entered => &[Entered],
        Verified => &[Entered, Verified],
        Active => &[Entered, Verified, Active],
        Retired => &[Entered, Verified, Active, Retired],
    };
    for next in path {
        cred.transition(*next).unwrap();
    }
    cred
}

/// Build an account whose credentials are in the given states. Generated
/// state vectors can name several actives, which no well-formed record has,
/// so every active after the first is turned into a retired credential.
fn account_with_states(states: &[CredentialState]) -> GatewayAccount {
    let mut account = GatewayAccount::new(
        1,
        "acct_prop".into(),
        AccountType::Test,
        PaymentMethods::card_only(),
        true,
    );

    let mut seen_active = false;
    for (i, state) in states.iter().enumerate() {
        let state = if *state == CredentialState::Active {
            if seen_active {
                CredentialState::Retired
            } else {
                seen_active = true;
                CredentialState::Active
            }
        } else {
            *state
        };
        account
            .credentials
            .push(credential_in(&format!("cred_{i}"), state));
    }
    account
}

proptest! {
    /// Property: transition() agrees with the edge relation exactly.
    ///
    /// Walking a credential through an arbitrary target sequence, each step
    /// succeeds iff can_transition_to allows it, and a rejected step leaves
    /// the state where it was.
    #[test]
    fn transition_agrees_with_the_edge_relation(
        targets in prop::collection::vec(state_strategy(), 1..12)
    ) {
        let mut cred =
            GatewayAccountCredential::new("cred_model".into(), PaymentProvider::Worldpay);
        let mut model = CredentialState::Created;

        for to in targets {
            let legal = model.can_transition_to(to);
            let result = cred.transition(to);

            prop_assert_eq!(result.is_ok(), legal);
            if legal {
                model = to;
            }
            prop_assert_eq!(cred.state(), model);
        }
    }

    /// Property: a retired credential accepts no transition at all.
    #[test]
    fn retired_accepts_no_transition(to in state_strategy()) {
        let mut cred = credential_in("cred_done", CredentialState::Retired);

        prop_assert!(cred.transition(to).is_err());
        prop_assert_eq!(cred.state(), CredentialState::Retired);
    }

    /// Property: after any sequence of promote attempts, at most one
    /// credential is active, promotes succeed only from Verified, and
    /// retired credentials never come back.
    #[test]
    fn at_most_one_active_after_any_promote_sequence(
        states in prop::collection::vec(state_strategy(), 1..6),
        attempts in prop::collection::vec(0..8usize, 1..10),
    ) {
        let mut account = account_with_states(&states);

        for idx in attempts {
            let id = format!("cred_{idx}");
            let before = account.credential(&id).map(|c| c.state());
            let retired_before: Vec<String> = account
                .credentials
                .iter()
                .filter(|c| c.state() == CredentialState::Retired)
                .map(|c| c.external_id.clone())
                .collect();

            let result = account.promote_credential(&id);

            match before {
                Some(CredentialState::Verified) => {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(
                        account.credential(&id).map(|c| c.state()),
                        Some(CredentialState::Active)
                    );
                }
                _ => prop_assert!(result.is_err()),
            }

            let active = account
                .credentials
                .iter()
                .filter(|c| c.state() == CredentialState::Active)
                .count();
            prop_assert!(active <= 1, "found {} active credentials", active);

            for id in &retired_before {
                prop_assert_eq!(
                    account.credential(id).map(|c| c.state()),
                    Some(CredentialState::Retired)
                );
            }
        }
    }

    /// Property: credential records survive a CBOR round trip whatever the
    /// field map holds. Persistence correctness underpins everything else.
    #[test]
    fn credential_roundtrips_through_cbor(
        fields in prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 0..6),
        state in state_strategy(),
    ) {
        let mut cred = credential_in("cred_cbor", state);
        cred.fields = fields;

        let encoding = minicbor::to_vec(&cred).unwrap();
        let decoded: GatewayAccountCredential = minicbor::decode(&encoding).unwrap();

        prop_assert_eq!(cred, decoded);
    }
}
