//! Business operations. Every public method takes the calling [`AuthUser`]
//! and checks capability and project access before touching data.
//!
//! [`AuthUser`]: crate::auth::AuthUser

pub mod access;
pub mod activity;
pub mod dashboard;
pub mod drawings;
pub mod materials;
pub mod milestones;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod scope_items;
pub mod snagging;
pub mod transfer;
