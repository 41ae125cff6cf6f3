//! Request-time gate for onboarding step access
//!
//! Applied before a step's form is shown or submitted. Task status is
//! re-derived on every call; two browser tabs can change the underlying
//! credential between requests, so nothing here is ever cached.

use crate::account::{GatewayAccount, PaymentProvider};
use crate::error::TaskError;
use crate::tasks::{self, TaskId, TaskStatus};

/// Outcome of the gate. Not an error: the caller turns `AlreadyCompleted`
/// into a dead-end page and `OutOfSequence` into a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAccess {
    Allowed,
    AlreadyCompleted,
    OutOfSequence { redirect_to: &'static str },
}

/// Check whether the user may enter the step backing `task_id`.
///
/// Rejects re-entry into a completed step and early entry into a step whose
/// prerequisites are unmet. Asking about a task the provider's journey does
/// not contain is a caller bug, reported as an error.
pub fn guard_task_access(
    account: &GatewayAccount,
    provider: PaymentProvider,
    task_id: TaskId,
) -> Result<TaskAccess, TaskError> {
    let computed = tasks::compute_tasks(account, provider);
    let task = computed
        .iter()
        .find(|t| t.id == task_id)
        .ok_or(TaskError::UnknownTask {
            task: task_id,
            provider,
        })?;

    let access = match task.status {
        TaskStatus::Completed => TaskAccess::AlreadyCompleted,
        TaskStatus::CannotStart => TaskAccess::OutOfSequence {
            redirect_to: tasks::summary_path(provider),
        },
        TaskStatus::NotStarted => TaskAccess::Allowed,
    };

    Ok(access)
}
