//! Validation utilities for hostingde-webhook
//!
//! This module provides helpers for the domain names handed over by the host
//! runtime before they are sent to the hosting.de API.

use anyhow::{anyhow, Result};

use crate::constants::{MAX_DOMAIN_NAME_LENGTH, MAX_LABEL_LENGTH};

/// Strips the trailing dot of a fully-qualified name
///
/// hosting.de does not use trailing-dot notation.
///
/// ```
/// use hostingde_webhook::validation::un_fqdn;
///
/// assert_eq!(un_fqdn("example.com."), "example.com");
/// assert_eq!(un_fqdn("example.com"), "example.com");
/// ```
pub fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Validates that a string is a usable DNS name
///
/// # Validation Rules
///
/// 1. **Length constraints**:
///    - Maximum total length: 253 characters (excluding trailing dot)
///    - Maximum label length: 63 characters
///
/// 2. **Syntax rules**:
///    - No empty labels, no leading dot, no spaces
///    - Labels cannot start or end with hyphens (`-`)
///
/// 3. **Allowed characters**: letters, digits, `-`, and `_` (for
///    `_acme-challenge` style labels)
///
/// A trailing dot (FQDN notation) is accepted.
///
/// # Examples
///
/// ```
/// use hostingde_webhook::validation::validate_domain_name;
///
/// assert!(validate_domain_name("_acme-challenge.example.com.").is_ok());
/// assert!(validate_domain_name("example..com").is_err());
/// ```
pub fn validate_domain_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("Domain name cannot be empty"));
    }
    if name.contains(char::is_whitespace) {
        return Err(anyhow!("Domain name cannot contain spaces"));
    }

    let name = un_fqdn(name);
    if name.is_empty() {
        return Err(anyhow!("Domain name cannot be empty"));
    }
    if name.len() > MAX_DOMAIN_NAME_LENGTH {
        return Err(anyhow!(
            "Domain name too long (max {} characters, got {})",
            MAX_DOMAIN_NAME_LENGTH,
            name.len()
        ));
    }
    if name.starts_with('.') {
        return Err(anyhow!("Domain name cannot start with a dot"));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(anyhow!("Domain name contains empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(anyhow!(
                "Domain name label too long (max {} characters, got {})",
                MAX_LABEL_LENGTH,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(anyhow!("Domain name label cannot start or end with hyphen"));
        }
        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_alphanumeric() && *ch != '-' && *ch != '_')
        {
            return Err(anyhow!(
                "Domain name contains invalid character: '{}' (allowed: letters, digits, '-', '_')",
                ch
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_un_fqdn() {
        assert_eq!(un_fqdn("example.com."), "example.com");
        assert_eq!(un_fqdn("example.com"), "example.com");
        assert_eq!(un_fqdn("_acme-challenge.Example.COM."), "_acme-challenge.Example.COM");
        assert_eq!(un_fqdn(""), "");
        assert_eq!(un_fqdn("."), "");
    }

    #[test]
    fn test_validate_domain_name_valid_cases() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("example.com.").is_ok());
        assert!(validate_domain_name("_acme-challenge.example.com.").is_ok());
        assert!(validate_domain_name("a-b.example.com").is_ok());
        assert!(validate_domain_name(&("a".repeat(63) + ".com")).is_ok());
    }

    #[test]
    fn test_validate_domain_name_invalid_cases() {
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name(".").is_err());
        assert!(validate_domain_name(" ").is_err());
        assert!(validate_domain_name("example com").is_err());
        assert!(validate_domain_name(".example.com").is_err());
        assert!(validate_domain_name("example..com").is_err());
        assert!(validate_domain_name("-example.com").is_err());
        assert!(validate_domain_name("example-.com").is_err());
        assert!(validate_domain_name("*.example.com").is_err());
        assert!(validate_domain_name(&("a".repeat(64) + ".com")).is_err());
        assert!(validate_domain_name(&"a.".repeat(254)).is_err());
    }
}
