#![forbid(unsafe_code)]

//! `teamstore`: relational persistence for teams, memberships, preferences,
//! statuses, jobs and system settings.

pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod roles;

pub use config::StoreConfig;
pub use errors::{Result, StoreError};
