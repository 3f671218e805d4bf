//! Field checks shared by the services.

use chrono::{DateTime, Utc};

use super::error::{ServiceError, ServiceResult};

/// Parses an ISO-8601 / RFC 3339 timestamp.
pub fn parse_timestamp(field: &'static str, raw: &str) -> ServiceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ServiceError::validation(field, format!("'{}' is not an ISO-8601 timestamp: {}", raw, e)))
}

pub fn parse_optional_timestamp(field: &'static str, raw: Option<&str>) -> ServiceResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_timestamp(field, raw).map(Some),
        None => Ok(None),
    }
}

pub fn ensure_after(end: DateTime<Utc>, start: DateTime<Utc>) -> ServiceResult<()> {
    if end <= start {
        return Err(ServiceError::validation(
            "end_date",
            format!("end {} must be after start {}", end.to_rfc3339(), start.to_rfc3339()),
        ));
    }
    Ok(())
}

/// `#rrggbb`
pub fn validate_hex_color(field: &'static str, value: &str) -> ServiceResult<()> {
    let digits = value.strip_prefix('#').unwrap_or("");
    if value.len() != 7 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ServiceError::validation(field, format!("'{}' is not a #rrggbb color", value)));
    }
    Ok(())
}

pub fn validate_uri(field: &'static str, value: &str) -> ServiceResult<()> {
    match url::Url::parse(value) {
        Ok(url) if url.has_host() || !url.cannot_be_a_base() => Ok(()),
        _ => Err(ServiceError::validation(field, format!("'{}' is not an absolute URI", value))),
    }
}

pub fn validate_email(value: &str) -> ServiceResult<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(ServiceError::validation("email", format!("'{}' is not an email address", value)));
    }
    Ok(())
}

pub fn require_text(field: &'static str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_must_be_iso8601() {
        let ts = parse_timestamp("creation_date", "2024-01-01T10:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert!(parse_timestamp("creation_date", "01/01/2024").is_err());
        assert_eq!(parse_optional_timestamp("end_date", Some("  ")).unwrap(), None);
    }

    #[test]
    fn end_must_follow_start() {
        let start = parse_timestamp("creation_date", "2024-01-01T10:00:00Z").unwrap();
        let end = parse_timestamp("end_date", "2024-01-01T09:00:00Z").unwrap();
        assert!(ensure_after(end, start).is_err());
        assert!(ensure_after(start, start).is_err());
        assert!(ensure_after(start, end).is_ok());
    }

    #[test]
    fn colors_are_hex_triplets() {
        assert!(validate_hex_color("text_color", "#1a2B3c").is_ok());
        assert!(validate_hex_color("text_color", "1a2b3c").is_err());
        assert!(validate_hex_color("text_color", "#12345").is_err());
        assert!(validate_hex_color("text_color", "#12345g").is_err());
    }

    #[test]
    fn uris_must_be_absolute() {
        assert!(validate_uri("data", "https://cdn.example.com/medal.png").is_ok());
        assert!(validate_uri("data", "/medal.png").is_err());
        assert!(validate_uri("data", "medal").is_err());
    }
}
