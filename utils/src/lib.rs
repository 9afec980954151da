//! Shared utilities for the linkgarden workspace.
//!
//! Currently: build/version information exposed through the services
//! health endpoint, and input sanitization shared by the API layer.

pub mod sanitize;
pub mod version_info;
