//! Load balancer naming rules

use crate::error::{AlbError, Result};

pub const MAX_NAME_LEN: usize = 32;

/// Validate a load balancer name.
///
/// Names are 1 to 32 characters of ASCII letters, digits and hyphens, and
/// must neither begin nor end with a hyphen.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AlbError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(AlbError::Validation(format!(
            "name cannot be longer than {} characters: {:?}",
            MAX_NAME_LEN, name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AlbError::Validation(format!(
            "only alphanumeric characters and hyphens allowed in name: {:?}",
            name
        )));
    }
    if name.starts_with('-') {
        return Err(AlbError::Validation(format!(
            "name cannot begin with a hyphen: {:?}",
            name
        )));
    }
    if name.ends_with('-') {
        return Err(AlbError::Validation(format!(
            "name cannot end with a hyphen: {:?}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        let longest = "a".repeat(MAX_NAME_LEN);
        for name in ["web", "web-alb-01", "A1", longest.as_str()] {
            assert!(validate_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        for name in ["", "-web", "web-", "web_alb", "web.alb", "ウェブ", too_long.as_str()] {
            assert!(
                matches!(validate_name(name), Err(AlbError::Validation(_))),
                "{:?} should be rejected",
                name
            );
        }
    }
}
