use std::sync::LazyLock;

use regex::Regex;

use super::ApiError;
use super::types::PageQuery;
use crate::constants::{auth, pagination};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Shape check only; ownership is proven by the confirmation email.
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || trimmed.len() > 254 || !EMAIL_RE.is_match(trimmed) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < auth::MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            auth::MIN_PASSWORD_LENGTH
        )));
    }
    Ok(password)
}

pub fn validate_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

/// Normalizes a list query: page at least 1, page size clamped to
/// 1..=100, empty search dropped.
pub fn normalize_page_query(query: PageQuery) -> (u64, u64, Option<String>) {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, pagination::MAX_PAGE_SIZE);
    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (page, page_size, search)
}

/// Checks that a region geometry parses as JSON and carries one of the
/// GeoJSON types the map frontend can render.
pub fn validate_geojson(geometry: &str) -> Result<(), ApiError> {
    const ALLOWED: &[&str] = &["Feature", "FeatureCollection", "Polygon", "MultiPolygon"];

    let value: serde_json::Value = serde_json::from_str(geometry)
        .map_err(|e| ApiError::validation(format!("Geometry is not valid JSON: {e}")))?;

    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ApiError::validation("Geometry is missing a GeoJSON \"type\""))?;

    if !ALLOWED.contains(&kind) {
        return Err(ApiError::validation(format!(
            "Unsupported GeoJSON type: {kind}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@telegan.local").is_ok());
        assert!(validate_email("  padded@example.com  ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1).is_ok());
        assert!(validate_id(0).is_err());
        assert!(validate_id(-5).is_err());
    }

    #[test]
    fn test_normalize_page_query() {
        let (page, size, search) = normalize_page_query(PageQuery {
            page: 0,
            page_size: 5000,
            search: Some("   ".to_string()),
        });
        assert_eq!(page, 1);
        assert_eq!(size, 100);
        assert!(search.is_none());

        let (page, size, search) = normalize_page_query(PageQuery {
            page: 3,
            page_size: 10,
            search: Some(" finca ".to_string()),
        });
        assert_eq!(page, 3);
        assert_eq!(size, 10);
        assert_eq!(search.as_deref(), Some("finca"));
    }

    #[test]
    fn test_validate_geojson() {
        assert!(validate_geojson(r#"{"type":"Polygon","coordinates":[]}"#).is_ok());
        assert!(validate_geojson(r#"{"type":"FeatureCollection","features":[]}"#).is_ok());
        assert!(validate_geojson("not json").is_err());
        assert!(validate_geojson(r#"{"coordinates":[]}"#).is_err());
        assert!(validate_geojson(r#"{"type":"Point","coordinates":[0,0]}"#).is_err());
    }
}
