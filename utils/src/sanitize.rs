//! Input sanitization for user-supplied titles and URLs.
//!
//! Titles are trimmed and stripped of control characters before they
//! reach the database. URLs are normalized (a bare `example.com`
//! becomes `https://example.com`) and must parse as http/https with a
//! real host. The API layer surfaces the returned message of the first
//! failing check as the 400 response body.

use url::Url;

/// Maximum length of a link title.
pub const MAX_LINK_TITLE_LEN: usize = 300;
/// Maximum length of a collection title.
pub const MAX_COLLECTION_TITLE_LEN: usize = 200;
/// Maximum length of a collection description.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// A human-readable validation failure, surfaced verbatim to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeError(pub String);

impl std::fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SanitizeError {}

fn strip_controls(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).collect()
}

/// Sanitize a free-text title: trim, drop control characters, enforce
/// a length cap.
pub fn sanitize_title(input: &str, max_len: usize) -> Result<String, SanitizeError> {
    let cleaned = strip_controls(input.trim());
    if cleaned.is_empty() {
        return Err(SanitizeError("Title is required".to_owned()));
    }
    if cleaned.chars().count() > max_len {
        return Err(SanitizeError(format!(
            "Title must be at most {max_len} characters"
        )));
    }
    Ok(cleaned)
}

/// Sanitize an optional description: trim, cap length, treat empty as
/// absent.
pub fn sanitize_description(input: &str) -> Result<Option<String>, SanitizeError> {
    let cleaned = strip_controls(input.trim());
    if cleaned.is_empty() {
        return Ok(None);
    }
    if cleaned.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(SanitizeError(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(Some(cleaned))
}

/// Normalize and validate a user-supplied URL.
///
/// A missing scheme defaults to `https://`. Only http/https URLs with
/// a host are accepted; the normalized form is returned.
pub fn sanitize_url(input: &str) -> Result<String, SanitizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError("URL is required".to_owned()));
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|_| invalid_url())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid_url());
    }
    match parsed.host_str() {
        Some(host) if host.contains('.') || host == "localhost" => {}
        _ => return Err(invalid_url()),
    }

    Ok(parsed.to_string())
}

fn invalid_url() -> SanitizeError {
    SanitizeError(
        "Invalid URL format. Please enter a valid URL with a proper domain \
         (e.g., example.com or https://example.com)"
            .to_owned(),
    )
}
