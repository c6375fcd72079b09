use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_FILE_NAME_LEN: usize = 255;
const MAX_TITLE_LEN: usize = 200;
const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 50;

pub const DEFAULT_PAGE_SIZE: i64 = 40;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn validate_person_name(name: &str, field: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "{field} cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
        return Err(Error::validation("Invalid email address"));
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(Error::validation("Invalid email address")),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password cannot exceed {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// File names become a single path segment in image storage.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
        return Err(Error::validation("Invalid file name length"));
    }
    if name.starts_with('.') {
        return Err(Error::validation("File name cannot start with a period"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::validation(
            "File name can only contain alphanumeric characters, hyphens, underscores, and periods",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(Error::validation(format!("At most {MAX_TAGS} tags allowed")));
    }
    if let Some(tag) = tags
        .iter()
        .find(|t| t.trim().is_empty() || t.chars().count() > MAX_TAG_LEN)
    {
        return Err(Error::validation(format!("Invalid tag: '{tag}'")));
    }
    Ok(())
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_custom_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| Error::validation(format!("Invalid date: '{raw}'")))
}

/// Checks an inline picture: raw base64 or a `data:<mime>;base64,` URL whose
/// decoded size stays within `max_bytes`.
pub fn validate_inline_image(data: &str, max_bytes: usize) -> Result<()> {
    let encoded = match data.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| Error::validation("Malformed data URL"))?;
            if !meta.ends_with(";base64") || !meta.starts_with("image/") {
                return Err(Error::validation("Inline image must be a base64 image data URL"));
            }
            payload
        }
        None => data,
    };

    if encoded.is_empty() {
        return Err(Error::validation("Inline image is empty"));
    }
    // base64 expands 3 bytes into 4 characters
    if encoded.len() / 4 * 3 > max_bytes {
        return Err(Error::validation(format!(
            "Inline image exceeds {max_bytes} bytes"
        )));
    }

    STANDARD
        .decode(encoded.trim())
        .map_err(|_| Error::validation("Inline image is not valid base64"))?;
    Ok(())
}

/// Clamps list pagination to sane bounds.
#[must_use]
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
