//! Shared object types for the authsync hub and spoke stores.

pub mod config;
pub mod grant;
pub mod rbac;
pub mod validate;
