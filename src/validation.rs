use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Trims and lowercases an email so uniqueness and lookups are
/// case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Treats absent and empty strings alike, the way required-field checks expect.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses a path id. Anything that is not a UUID is reported as the supplied
/// not-found error, since such a resource cannot exist.
pub fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(not_found))
}

/// Keeps the entries that parse as ids and silently drops the rest.
pub fn parse_ids_lenient(raw: &[String]) -> Vec<Uuid> {
    raw.iter()
        .filter_map(|id| Uuid::parse_str(id.trim()).ok())
        .collect()
}

pub fn validate_course_name(name: &str) -> Result<String, ApiError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if !(3..=255).contains(&len) {
        return Err(ApiError::validation(
            "course_name must be a string between 3 and 255 chars",
        ));
    }
    Ok(trimmed.to_string())
}

/// normalize_course_code
///
/// Uppercases first, then requires 4 to 10 ASCII letters or digits. Storing
/// the uppercased form is what makes code uniqueness case-insensitive.
pub fn normalize_course_code(code: &str) -> Result<String, ApiError> {
    let upper = code.to_uppercase();
    let valid = (4..=10).contains(&upper.len())
        && upper
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !valid {
        return Err(ApiError::validation(
            "course_code must match /^[A-Z0-9]{4,10}$/",
        ));
    }
    Ok(upper)
}

pub fn validate_course_duration(weeks: i64) -> Result<i32, ApiError> {
    if !(1..=104).contains(&weeks) {
        return Err(ApiError::validation(
            "course_duration must be a number between 1 and 104",
        ));
    }
    // The range check above keeps this in bounds.
    Ok(weeks as i32)
}

/// clamp_page
///
/// Missing, non-numeric and zero values fall back to page 1; anything lower is
/// raised to 1.
pub fn clamp_page(raw: Option<&str>) -> i64 {
    parse_positive(raw).unwrap_or(DEFAULT_PAGE).max(1)
}

/// clamp_limit
///
/// Missing, non-numeric and zero values fall back to 20; the result is then
/// clamped to [1, 100].
pub fn clamp_limit(raw: Option<&str>) -> i64 {
    parse_positive(raw)
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
}

/// Number of pages for `total` items; an empty result still has one page.
pub fn page_count(total: i64, limit: i64) -> i64 {
    let pages = (total + limit - 1) / limit;
    pages.max(1)
}

/// Escapes `%`, `_` and `\` so a search term matches literally inside ILIKE.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
