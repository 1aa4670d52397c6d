//! OneDrive path filesystem library
//!
//! Exposes the flat, ID-addressed OneDrive item store as a hierarchical,
//! path-addressed filesystem. The `fs` module holds the path resolution and
//! caching core; everything else is plumbing around it.

pub mod auth;
pub mod config;
pub mod fs;
pub mod log_appender;
pub mod onedrive_service;
