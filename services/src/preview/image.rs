use url::Url;
use uuid::Uuid;

use crate::storage::FileStorage;

/// Preview images larger than this are dropped in favour of the
/// fallback image.
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Resolve a scraped image reference against the page it came from.
///
/// Handles absolute URLs, protocol-relative `//cdn...` references, and
/// site-relative or document-relative paths. Returns `None` when the
/// result is not a fetchable http(s) URL.
pub fn resolve_image_url(image: &str, page_url: &str) -> Option<String> {
    let image = image.trim();
    if image.is_empty() {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    let resolved = if image.starts_with("//") {
        Url::parse(&format!("{}:{image}", base.scheme())).ok()?
    } else {
        base.join(image).ok()?
    };
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Pick a content type for a fetched image: trust the response header
/// when it names an image, fall back to the URL's extension, and
/// default to JPEG.
pub fn content_type_for(header: Option<&str>, image_url: &str) -> String {
    if let Some(value) = header {
        let value = value.split(';').next().unwrap_or(value).trim();
        if value.starts_with("image/") {
            return value.to_string();
        }
    }
    match extension_of(image_url) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        _ => "image/jpeg",
    }
    .to_string()
}

/// File extension used when storing an image of the given content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/x-icon" => "ico",
        _ => "jpg",
    }
}

fn extension_of(image_url: &str) -> Option<&str> {
    let path = image_url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext)
}

/// Fetch the page's preview image and re-host it, returning the public
/// URL. Any failure along the way is logged and maps to `None` so the
/// caller can degrade to the fallback image.
pub(super) async fn fetch_and_upload<F: FileStorage>(
    http: &reqwest::Client,
    files: &F,
    image: &str,
    link_id: Uuid,
    page_url: &str,
) -> Option<String> {
    let Some(image_url) = resolve_image_url(image, page_url) else {
        tracing::debug!(%link_id, image, "Unresolvable preview image reference");
        return None;
    };

    let response = match http
        .get(&image_url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::debug!(%link_id, %image_url, status = %r.status(), "Preview image fetch rejected");
            return None;
        }
        Err(e) => {
            tracing::debug!(%link_id, %image_url, "Preview image fetch failed: {e}");
            return None;
        }
    };

    let content_type = content_type_for(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        &image_url,
    );

    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(%link_id, %image_url, "Preview image body read failed: {e}");
            return None;
        }
    };
    if bytes.len() > MAX_IMAGE_BYTES {
        tracing::debug!(%link_id, %image_url, size = bytes.len(), "Preview image exceeds size limit");
        return None;
    }

    let key = format!("link-previews/{link_id}.{}", extension_for(&content_type));
    match files.upload(&key, bytes.to_vec(), &content_type).await {
        Ok(public_url) => Some(public_url),
        Err(e) => {
            tracing::warn!(%link_id, %key, "Preview image upload failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_absolute_urls_unchanged() {
        assert_eq!(
            resolve_image_url("https://cdn.example.com/og.png", "https://example.com/post"),
            Some("https://cdn.example.com/og.png".to_string())
        );
    }

    #[test]
    fn resolves_protocol_relative_with_page_scheme() {
        assert_eq!(
            resolve_image_url("//cdn.example.com/og.png", "https://example.com/post"),
            Some("https://cdn.example.com/og.png".to_string())
        );
        assert_eq!(
            resolve_image_url("//cdn.example.com/og.png", "http://example.com/post"),
            Some("http://cdn.example.com/og.png".to_string())
        );
    }

    #[test]
    fn resolves_site_relative_and_document_relative_paths() {
        assert_eq!(
            resolve_image_url("/images/og.png", "https://example.com/blog/post"),
            Some("https://example.com/images/og.png".to_string())
        );
        assert_eq!(
            resolve_image_url("og.png", "https://example.com/blog/post"),
            Some("https://example.com/blog/og.png".to_string())
        );
    }

    #[test]
    fn rejects_empty_and_non_http_results() {
        assert_eq!(resolve_image_url("", "https://example.com"), None);
        assert_eq!(resolve_image_url("   ", "https://example.com"), None);
        assert_eq!(
            resolve_image_url("data:image/png;base64,AAAA", "https://example.com"),
            None
        );
    }

    #[test]
    fn header_content_type_wins_when_it_is_an_image() {
        assert_eq!(
            content_type_for(Some("image/webp"), "https://example.com/a.png"),
            "image/webp"
        );
        assert_eq!(
            content_type_for(Some("image/png; charset=binary"), "https://example.com/a"),
            "image/png"
        );
    }

    #[test]
    fn non_image_header_falls_back_to_extension_then_jpeg() {
        assert_eq!(
            content_type_for(Some("text/html"), "https://example.com/a.png"),
            "image/png"
        );
        assert_eq!(
            content_type_for(None, "https://example.com/a.gif?size=large"),
            "image/gif"
        );
        assert_eq!(content_type_for(None, "https://example.com/a"), "image/jpeg");
    }

    #[test]
    fn extension_round_trips_known_types() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/octet-stream"), "jpg");
    }
}
