//! Version information for the application, populated at build time.
//!
//! Environment display format:
//! - Prod (stable): `stable:{version}`
//! - Pr: `pr:{number}` (number passed via env var at build time)
//! - Nightly: `nightly:{date}`
//! - Local/Test: `main:{commit}`

/// Runtime environment enum for services that determine their
/// environment at runtime rather than compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    /// Local development
    Local,
    /// Production
    Prod,
    /// Test environment
    Test,
    /// Pull request preview
    Pr,
    /// Nightly build
    Nightly,
}

/// Get the build date in RFC3339 format
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Get the git commit hash (short)
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

/// Get the package version
pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format version string for a runtime-determined environment.
///
/// Format: `{env}:{info}` where:
/// - Pr: `pr:{pr_number}` (number from `PR_NUMBER` env var at build time)
/// - Nightly: `nightly:{date}` (first 10 chars of build date)
/// - Test/Local: `main:{commit}`
/// - Prod: `stable:{version}`
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Pr => {
            let pr_number = option_env!("PR_NUMBER").unwrap_or("unknown");
            format!("pr:{pr_number}")
        }
        RuntimeEnv::Nightly => {
            // BUILD_DATE is RFC3339 (e.g. "2026-01-03T12:00:00+00:00"), keep the date part
            let date = build_date();
            let date_part = if date.len() >= 10 && date.is_ascii() {
                &date[..10]
            } else {
                date
            };
            format!("nightly:{date_part}")
        }
        RuntimeEnv::Test | RuntimeEnv::Local => format!("main:{}", build_commit()),
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
    }
}
