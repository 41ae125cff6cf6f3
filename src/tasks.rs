//! Onboarding task model
//!
//! Tasks are computed from the switching credential's current field state
//! every time they are asked for. They are never persisted, so there is no
//! second copy of onboarding progress to drift from the credential record.

use std::fmt;

use crate::account::{GatewayAccount, PaymentProvider};
use crate::provider::field_names;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    LinkCredentials,
    ConfigureFlexCredentials,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::LinkCredentials => "link-credentials",
            TaskId::ConfigureFlexCredentials => "configure-flex-credentials",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `CannotStart` is distinct from `NotStarted` so callers can tell "not
/// attempted" apart from "not yet attemptable" and the guard can reject
/// out-of-sequence access rather than just incompleteness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    Completed,
    CannotStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupTask {
    pub id: TaskId,
    pub label: &'static str,
    pub path: &'static str,
    pub status: TaskStatus,
}

/// One registered onboarding requirement. Completion is defined entirely by
/// the presence of `required_fields` on the switching credential, and the
/// dependency edges are plain data, so the graph is inspectable in tests.
#[derive(Debug)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub label: &'static str,
    pub path: &'static str,
    pub requires: &'static [TaskId],
    pub required_fields: &'static [&'static str],
}

const WORLDPAY_TASKS: &[TaskDefinition] = &[
    TaskDefinition {
        id: TaskId::LinkCredentials,
        label: "Link your Worldpay account",
        path: "/switch-psp/worldpay-credentials",
        requires: &[],
        required_fields: &[
            field_names::MERCHANT_CODE,
            field_names::USERNAME,
            field_names::PASSWORD,
        ],
    },
    TaskDefinition {
        id: TaskId::ConfigureFlexCredentials,
        label: "Configure 3DS Flex credentials",
        path: "/switch-psp/flex-credentials",
        requires: &[TaskId::LinkCredentials],
        required_fields: &[
            field_names::ISSUER,
            field_names::ORGANISATIONAL_UNIT_ID,
            field_names::JWT_MAC_KEY,
        ],
    },
];

const STRIPE_TASKS: &[TaskDefinition] = &[TaskDefinition {
    id: TaskId::LinkCredentials,
    label: "Link your Stripe account",
    path: "/switch-psp/stripe-credentials",
    requires: &[],
    required_fields: &[field_names::STRIPE_ACCOUNT_ID, field_names::API_TOKEN],
}];

pub fn task_definitions(provider: PaymentProvider) -> &'static [TaskDefinition] {
    match provider {
        PaymentProvider::Worldpay => WORLDPAY_TASKS,
        PaymentProvider::Stripe => STRIPE_TASKS,
    }
}

/// Where the guard bounces out-of-sequence requests to.
pub fn summary_path(provider: PaymentProvider) -> &'static str {
    match provider {
        PaymentProvider::Worldpay | PaymentProvider::Stripe => "/switch-psp",
    }
}

/// Derive the ordered task list for switching this account to `target`.
///
/// Pure function of the account's current switching credential; tolerates a
/// missing or freshly created credential by reporting nothing complete.
pub fn compute_tasks(account: &GatewayAccount, target: PaymentProvider) -> Vec<SetupTask> {
    let candidate = account.switching_candidate_for(target);
    let definitions = task_definitions(target);

    // field presence first, so dependency checks see every task's completion
    let completed: Vec<bool> = definitions
        .iter()
        .map(|def| {
            candidate.is_some_and(|cred| {
                def.required_fields
                    .iter()
                    .all(|field| cred.fields.get(*field).is_some_and(|v| !v.is_empty()))
            })
        })
        .collect();

    definitions
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let status = if completed[i] {
                TaskStatus::Completed
            } else if def.requires.iter().any(|dep| {
                !definitions
                    .iter()
                    .position(|d| d.id == *dep)
                    .map(|j| completed[j])
                    .unwrap_or(false)
            }) {
                TaskStatus::CannotStart
            } else {
                TaskStatus::NotStarted
            };

            SetupTask {
                id: def.id,
                label: def.label,
                path: def.path,
                status,
            }
        })
        .collect()
}

pub fn has_incomplete_tasks(tasks: &[SetupTask]) -> bool {
    tasks.iter().any(|t| t.status != TaskStatus::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountType, PaymentMethods};
    use crate::credential::GatewayAccountCredential;

    fn account_with_worldpay_fields(fields: &[(&str, &str)]) -> GatewayAccount {
        let mut cred =
            GatewayAccountCredential::new("cred_wp".into(), PaymentProvider::Worldpay);
        for (k, v) in fields {
            cred.fields.insert((*k).to_owned(), (*v).to_owned());
        }
        let mut account = GatewayAccount::new(
            1,
            "acct_test".into(),
            AccountType::Test,
            PaymentMethods::card_only(),
            true,
        );
        account.credentials.push(cred);
        account
    }

    #[test]
    fn fresh_credential_reports_nothing_complete() {
        let account = account_with_worldpay_fields(&[]);
        let tasks = compute_tasks(&account, PaymentProvider::Worldpay);

        assert_eq!(tasks[0].status, TaskStatus::NotStarted);
        assert_eq!(tasks[1].status, TaskStatus::CannotStart);
        assert!(has_incomplete_tasks(&tasks));
    }

    #[test]
    fn no_credential_at_all_reports_nothing_complete() {
        let account = GatewayAccount::new(
            1,
            "acct_test".into(),
            AccountType::Test,
            PaymentMethods::card_only(),
            true,
        );
        let tasks = compute_tasks(&account, PaymentProvider::Worldpay);

        assert_eq!(tasks[0].status, TaskStatus::NotStarted);
        assert_eq!(tasks[1].status, TaskStatus::CannotStart);
    }

    #[test]
    fn linked_credentials_unblock_the_flex_task() {
        let account = account_with_worldpay_fields(&[
            (field_names::MERCHANT_CODE, "MERCHANTCODE"),
            (field_names::USERNAME, "user"),
            (field_names::PASSWORD, "pass"),
        ]);
        let tasks = compute_tasks(&account, PaymentProvider::Worldpay);

        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[1].status, TaskStatus::NotStarted);
        assert!(has_incomplete_tasks(&tasks));
    }

    #[test]
    fn all_fields_present_means_all_tasks_complete() {
        let account = account_with_worldpay_fields(&[
            (field_names::MERCHANT_CODE, "MERCHANTCODE"),
            (field_names::USERNAME, "user"),
            (field_names::PASSWORD, "pass"),
            (field_names::ISSUER, "issuer"),
            (field_names::ORGANISATIONAL_UNIT_ID, "org"),
            (field_names::JWT_MAC_KEY, "mac"),
        ]);
        let tasks = compute_tasks(&account, PaymentProvider::Worldpay);

        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
        assert!(!has_incomplete_tasks(&tasks));
    }

    #[test]
    fn empty_field_values_do_not_count() {
        let account = account_with_worldpay_fields(&[
            (field_names::MERCHANT_CODE, ""),
            (field_names::USERNAME, "user"),
            (field_names::PASSWORD, "pass"),
        ]);
        let tasks = compute_tasks(&account, PaymentProvider::Worldpay);

        assert_eq!(tasks[0].status, TaskStatus::NotStarted);
    }

    #[test]
    fn stripe_journey_is_a_single_task() {
        let account = GatewayAccount::new(
            1,
            "acct_test".into(),
            AccountType::Test,
            PaymentMethods::card_only(),
            true,
        );
        let tasks = compute_tasks(&account, PaymentProvider::Stripe);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, TaskId::LinkCredentials);
        assert_eq!(tasks[0].status, TaskStatus::NotStarted);
    }
}
