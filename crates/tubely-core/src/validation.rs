//! Input validation helpers for declared content types and external tool paths.

use crate::error::IngestError;

/// Reject tool paths containing shell metacharacters or traversal sequences.
pub fn validate_tool_path(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() {
        return Err("path is empty".to_string());
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(format!("path contains directory traversal: {}", path));
    }
    Ok(())
}

/// Parse a declared `Content-Type` header value into its bare media type.
///
/// Parameters after `;` are dropped and the result is lower-cased, so
/// `"Video/MP4; codecs=avc1"` becomes `"video/mp4"`.
pub fn parse_media_type(content_type: &str) -> Result<String, IngestError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if media_type.is_empty() {
        return Err(IngestError::InvalidContentType(
            "missing content type".to_string(),
        ));
    }

    Ok(media_type)
}

/// Parse `content_type` and require it to be one of `allowed`.
pub fn ensure_allowed_content_type(
    content_type: &str,
    allowed: &[String],
) -> Result<String, IngestError> {
    let media_type = parse_media_type(content_type)?;
    if !allowed.iter().any(|a| a == &media_type) {
        return Err(IngestError::InvalidContentType(format!(
            "{} is not allowed (expected one of: {})",
            media_type,
            allowed.join(", ")
        )));
    }
    Ok(media_type)
}
