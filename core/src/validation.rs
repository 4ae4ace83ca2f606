//! Field normalization shared by the request types

use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::Result;

pub const NAME_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 1000;

/// Trim `value` and require 1..=`max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} cannot be empty", field)));
    }
    if trimmed.chars().count() > max {
        return Err(Error::InvalidInput(format!(
            "{} cannot be longer than {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim `value` and require at most `max` characters; empty is allowed.
pub fn bounded_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(Error::InvalidInput(format!(
            "{} cannot be longer than {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

pub fn name(value: &str) -> Result<String> {
    required_text("name", value, NAME_MAX)
}

pub fn description(value: &str) -> Result<String> {
    bounded_text("description", value, DESCRIPTION_MAX)
}

/// Treat an explicit JSON `null` as "clear the field" rather than "absent".
/// Pair with `#[serde(default)]` on an `Option<Option<T>>` field.
pub fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_trimmed_and_bounded() {
        assert_eq!(name("  Backlog  ").unwrap(), "Backlog");
        assert!(name("   ").is_err());
        assert!(name(&"x".repeat(51)).is_err());
        assert_eq!(name(&"ż".repeat(50)).unwrap().chars().count(), 50);
    }

    #[test]
    fn test_description_allows_empty() {
        assert_eq!(description("").unwrap(), "");
        assert!(description(&"a".repeat(1001)).is_err());
    }
}
