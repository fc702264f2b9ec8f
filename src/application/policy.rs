//! Central authorization policy.
//!
//! Every handler funnels its gate through `require` so role rules live in one
//! table instead of being scattered across routes.

use crate::app_error::{AppError, AppResult};
use crate::entities::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageUsers,
    ManageDomain,
    ReviewRequests,
    ManageRemoteMailboxes,
    ImportMailbox,
    CreateMailEntry,
    ViewMailEntry,
    UpdateMailEntry,
    UpdateMailEntryPassword,
    DeleteMailEntry,
    SubmitRequest,
    UpdateOwnProfile,
    SubscribeNotifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
    NotApplicable,
}

pub fn authorize(role: Role, action: Action, ownership: Ownership) -> bool {
    match role {
        Role::Admin => true,
        Role::User => matches!(
            (action, ownership),
            (Action::ViewMailEntry, Ownership::Own)
                | (Action::UpdateMailEntryPassword, Ownership::Own)
                | (Action::SubmitRequest, Ownership::Own)
                | (Action::UpdateOwnProfile, Ownership::Own)
        ),
    }
}

pub fn require(role: Role, action: Action, ownership: Ownership) -> AppResult<()> {
    if authorize(role, action, ownership) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
