//! Team validation utilities

use thiserror::Error;

/// Errors that can occur during team validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team slug cannot be empty")]
    EmptySlug,

    #[error("Team slug exceeds maximum length of {0} characters")]
    SlugTooLong(usize),

    #[error("Team slug must start with a letter or number")]
    InvalidSlugStart,

    #[error("Team slug must end with a letter or number")]
    InvalidSlugEnd,

    #[error("Team slug contains invalid character: '{0}'. Only lowercase alphanumeric characters and hyphens are allowed")]
    InvalidSlugCharacter(char),

    #[error("Team slug cannot contain consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("Team name cannot be empty")]
    EmptyName,

    #[error("Team name exceeds maximum length of {0} characters")]
    NameTooLong(usize),
}

const MAX_SLUG_LENGTH: usize = 60;
const MAX_NAME_LENGTH: usize = 100;

/// Validate a team slug
///
/// Rules:
/// - Cannot be empty
/// - Maximum 60 characters
/// - Only lowercase alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
/// - No consecutive hyphens
pub fn validate_team_slug(slug: &str) -> Result<(), TeamValidationError> {
    if slug.is_empty() {
        return Err(TeamValidationError::EmptySlug);
    }

    if slug.len() > MAX_SLUG_LENGTH {
        return Err(TeamValidationError::SlugTooLong(MAX_SLUG_LENGTH));
    }

    let chars: Vec<char> = slug.chars().collect();

    if !chars[0].is_ascii_alphanumeric() {
        return Err(TeamValidationError::InvalidSlugStart);
    }

    if !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return Err(TeamValidationError::InvalidSlugEnd);
    }

    let mut prev_hyphen = false;

    for c in &chars {
        if *c == '-' {
            if prev_hyphen {
                return Err(TeamValidationError::ConsecutiveHyphens);
            }
            prev_hyphen = true;
        } else if c.is_ascii_alphanumeric() && !c.is_ascii_uppercase() {
            prev_hyphen = false;
        } else {
            return Err(TeamValidationError::InvalidSlugCharacter(*c));
        }
    }

    Ok(())
}

/// Validate a team name
pub fn validate_team_name(name: &str) -> Result<(), TeamValidationError> {
    if name.trim().is_empty() {
        return Err(TeamValidationError::EmptyName);
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(TeamValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Reduce arbitrary input to slug-safe characters
///
/// Lowercases, maps every run of disallowed characters to a single hyphen and
/// trims leading/trailing hyphens. Returns "team" when nothing survives, so
/// derived slugs (e.g. from an email local part) always validate.
pub fn sanitize_slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_hyphen = true; // suppress leading hyphens

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            out.push('-');
            prev_hyphen = true;
        }
    }

    let truncated: String = out.chars().take(MAX_SLUG_LENGTH).collect();
    let trimmed = truncated.trim_end_matches('-');

    if trimmed.is_empty() {
        "team".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(validate_team_slug("my-team").is_ok());
        assert!(validate_team_slug("team-123").is_ok());
        assert!(validate_team_slug("a").is_ok());
    }

    #[test]
    fn test_empty_slug() {
        assert_eq!(validate_team_slug(""), Err(TeamValidationError::EmptySlug));
    }

    #[test]
    fn test_slug_too_long() {
        let long_slug = "a".repeat(61);
        assert_eq!(
            validate_team_slug(&long_slug),
            Err(TeamValidationError::SlugTooLong(60))
        );
    }

    #[test]
    fn test_slug_invalid_start_end() {
        assert_eq!(
            validate_team_slug("-team"),
            Err(TeamValidationError::InvalidSlugStart)
        );
        assert_eq!(
            validate_team_slug("team-"),
            Err(TeamValidationError::InvalidSlugEnd)
        );
    }

    #[test]
    fn test_slug_invalid_character() {
        assert_eq!(
            validate_team_slug("team_name"),
            Err(TeamValidationError::InvalidSlugCharacter('_'))
        );
        assert_eq!(
            validate_team_slug("Team1"),
            Err(TeamValidationError::InvalidSlugCharacter('T'))
        );
    }

    #[test]
    fn test_slug_consecutive_hyphens() {
        assert_eq!(
            validate_team_slug("team--name"),
            Err(TeamValidationError::ConsecutiveHyphens)
        );
    }

    #[test]
    fn test_valid_team_names() {
        assert!(validate_team_name("My Team").is_ok());
        assert!(validate_team_name("T").is_ok());
    }

    #[test]
    fn test_invalid_team_names() {
        assert_eq!(validate_team_name(""), Err(TeamValidationError::EmptyName));
        assert_eq!(
            validate_team_name("   "),
            Err(TeamValidationError::EmptyName)
        );
        assert_eq!(
            validate_team_name(&"a".repeat(101)),
            Err(TeamValidationError::NameTooLong(100))
        );
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("Alice.Smith"), "alice-smith");
        assert_eq!(sanitize_slug("bob+test"), "bob-test");
        assert_eq!(sanitize_slug("---"), "team");
        assert_eq!(sanitize_slug(""), "team");

        assert!(validate_team_slug(&sanitize_slug("weird__local..part")).is_ok());
    }
}
