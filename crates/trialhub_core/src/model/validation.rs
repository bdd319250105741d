//! Shared input validation rules.
//!
//! # Invariants
//! - Slug-like names match `^[-a-zA-Z0-9_]+$` and are never blank.
//! - Validation never touches storage; uniqueness is reported by callers
//!   through `ValidationError::NameTaken`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length for user, team, organization, owner and project names.
pub const NAME_MAX_LEN: usize = 128;

static SLUG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

/// Client-side validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field absent or blank.
    MissingField(&'static str),
    /// Field value does not match the accepted format.
    InvalidName { field: &'static str, value: String },
    /// Field value exceeds the maximum length.
    TooLong { field: &'static str, max: usize },
    /// Name is already used by another record.
    NameTaken(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "`{field}` is required"),
            Self::InvalidName { field, value } => write!(
                f,
                "`{field}` value `{value}` may only contain letters, digits, `-` and `_`"
            ),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::NameTaken(name) => write!(f, "the given name `{name}` is already taken"),
        }
    }
}

impl Error for ValidationError {}

/// Validates and trims a required slug-like name.
///
/// Returns the trimmed value on success.
pub fn validate_slug_name(
    field: &'static str,
    value: Option<&str>,
) -> Result<String, ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: NAME_MAX_LEN,
        });
    }
    if !SLUG_NAME_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidName {
            field,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{validate_slug_name, ValidationError, NAME_MAX_LEN};

    #[test]
    fn missing_and_blank_values_are_rejected() {
        assert_eq!(
            validate_slug_name("name", None),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(
            validate_slug_name("name", Some("   ")),
            Err(ValidationError::MissingField("name"))
        );
    }

    #[test]
    fn accepts_slug_and_trims() {
        assert_eq!(
            validate_slug_name("name", Some("  new_project-2 ")).as_deref(),
            Ok("new_project-2")
        );
    }

    #[test]
    fn rejects_spaces_and_symbols() {
        let err = validate_slug_name("name", Some("my project")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidName { field: "name", .. }));
        assert!(validate_slug_name("name", Some("a/b")).is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(NAME_MAX_LEN + 1);
        assert_eq!(
            validate_slug_name("name", Some(long.as_str())),
            Err(ValidationError::TooLong {
                field: "name",
                max: NAME_MAX_LEN
            })
        );
    }
}
