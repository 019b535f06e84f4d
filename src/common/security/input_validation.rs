/// Normalization of untrusted strings before they reach a command argument,
/// a file path or a generated configuration line.
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field} contains characters that are not allowed: '{value}'")]
    InvalidCharacters { field: String, value: String },

    #[error("{field} is {actual} characters long, limit is {max_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual: usize,
    },

    #[error("{field} must be {expected}, got '{got}'")]
    InvalidFormat {
        field: String,
        expected: String,
        got: String,
    },

    /// System accounts, schemas and units the panel never touches
    #[error("{field} '{value}' is protected")]
    Protected { field: String, value: String },

    #[error("{field} rejected: {reason}")]
    Suspicious { field: String, reason: String },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Empty { field }
            | ValidationError::InvalidCharacters { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Protected { field, .. }
            | ValidationError::Suspicious { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

/// Maximum lengths for various input types
const MAX_TOKEN_LEN: usize = 255;
const MAX_USERNAME_LEN: usize = 32;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_RECORD_VALUE_LEN: usize = 2048;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 256;

/// Login shells an account may be given
pub const ALLOWED_SHELLS: &[&str] = &["/bin/bash", "/bin/sh", "/usr/sbin/nologin"];

/// Characters rejected in any argument handed to the command gatekeeper.
///
/// Arguments are passed as discrete argv entries and never through a shell, but
/// many of them end up inside files that are interpreted later (zone files,
/// crontabs, SQL), so the same set is enforced everywhere.
pub const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '<', '>', '\n', '\r'];

/// Regex patterns for validation
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]([A-Za-z0-9_-]*[A-Za-z0-9_])?(\.[A-Za-z0-9_]([A-Za-z0-9_-]*[A-Za-z0-9_])?)*$")
        .unwrap()
});

static RECORD_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._*@-]+$").unwrap());

static QUOTA_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+[KMGT]?$").unwrap());

static PHP_VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[5-9]\.[0-9]$").unwrap());

/// Strip every character outside `[A-Za-z0-9._-]`.
///
/// Never fails: an all-invalid input becomes the empty string, which callers
/// must reject. The result may still be semantically meaningless (`"."`,
/// `".."`), see [`sanitized_token`] for the checked variant.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Sanitize and reject the degenerate results the filter alone lets through
pub fn sanitized_token(field: &str, raw: &str) -> Result<String, ValidationError> {
    let token = sanitize(raw);

    if token.is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }

    if token.len() > MAX_TOKEN_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_TOKEN_LEN,
            actual: token.len(),
        });
    }

    if token.chars().all(|c| c == '.') {
        return Err(ValidationError::Suspicious {
            field: field.to_string(),
            reason: "reserved path name".to_string(),
        });
    }

    Ok(token)
}

/// Validate a system account name
pub fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let name = sanitized_token("username", raw)?;

    if name.len() > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max_length: MAX_USERNAME_LEN,
            actual: name.len(),
        });
    }

    if name.starts_with('-') {
        return Err(ValidationError::Suspicious {
            field: "username".to_string(),
            reason: "cannot start with hyphen".to_string(),
        });
    }

    Ok(name)
}

/// Validate a domain name used as a file name and inside generated config
pub fn validate_domain(raw: &str) -> Result<String, ValidationError> {
    let domain = sanitized_token("domain", raw)?.to_ascii_lowercase();

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(ValidationError::TooLong {
            field: "domain".to_string(),
            max_length: MAX_DOMAIN_LEN,
            actual: domain.len(),
        });
    }

    if !DOMAIN_PATTERN.is_match(&domain) {
        return Err(ValidationError::InvalidFormat {
            field: "domain".to_string(),
            expected: "dot-separated labels of letters, digits and hyphens".to_string(),
            got: domain,
        });
    }

    Ok(domain)
}

/// Validate a password that will be hashed or handed to `chpasswd` on stdin
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Empty {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            expected: format!("at least {} characters", MIN_PASSWORD_LEN),
            got: "<redacted>".to_string(),
        });
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max_length: MAX_PASSWORD_LEN,
            actual: password.len(),
        });
    }

    // chpasswd reads one `user:password` per line
    if password.chars().any(|c| c.is_control()) {
        return Err(ValidationError::Suspicious {
            field: "password".to_string(),
            reason: "contains control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate an IPv4 or IPv6 address
pub fn validate_ip_address(raw: &str) -> Result<IpAddr, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: "ip".to_string(),
        });
    }

    trimmed
        .parse::<IpAddr>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "ip".to_string(),
            expected: "IPv4 or IPv6 address".to_string(),
            got: trimmed.to_string(),
        })
}

/// Validate a login shell against [`ALLOWED_SHELLS`]
pub fn validate_shell(shell: &str) -> Result<(), ValidationError> {
    if ALLOWED_SHELLS.contains(&shell) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "shell".to_string(),
            expected: ALLOWED_SHELLS.join(", "),
            got: shell.to_string(),
        })
    }
}

/// Split an address into sanitized `(local, domain)` parts
pub fn split_email(raw: &str) -> Result<(String, String), ValidationError> {
    let (local, domain) = raw.split_once('@').ok_or_else(|| ValidationError::InvalidFormat {
        field: "email".to_string(),
        expected: "local@domain".to_string(),
        got: raw.to_string(),
    })?;

    let local = sanitized_token("email", local)?;
    let domain = validate_domain(domain)?;
    Ok((local, domain))
}

/// Validate the owner column of a DNS record (`@`, `www`, `*.dev`, `_dmarc`)
pub fn validate_record_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_DOMAIN_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max_length: MAX_DOMAIN_LEN,
            actual: name.len(),
        });
    }

    if !RECORD_NAME_PATTERN.is_match(name) {
        return Err(ValidationError::InvalidCharacters {
            field: "name".to_string(),
            value: name.to_string(),
        });
    }

    Ok(name.to_string())
}

/// Validate the data column of a DNS record
pub fn validate_record_value(raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty {
            field: "value".to_string(),
        });
    }

    if value.len() > MAX_RECORD_VALUE_LEN {
        return Err(ValidationError::TooLong {
            field: "value".to_string(),
            max_length: MAX_RECORD_VALUE_LEN,
            actual: value.len(),
        });
    }

    if let Some(c) = find_metacharacter(value) {
        return Err(ValidationError::Suspicious {
            field: "value".to_string(),
            reason: format!("contains shell metacharacter: {:?}", c),
        });
    }

    Ok(value.to_string())
}

/// Validate a mailbox quota such as `500M` or `1G`
pub fn validate_quota(raw: &str) -> Result<String, ValidationError> {
    if QUOTA_PATTERN.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "quota".to_string(),
            expected: "number with optional K/M/G/T suffix".to_string(),
            got: raw.to_string(),
        })
    }
}

/// Validate a PHP-FPM version such as `8.2`
pub fn validate_php_version(raw: &str) -> Result<String, ValidationError> {
    if PHP_VERSION_PATTERN.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "php".to_string(),
            expected: "major.minor, e.g. 8.2".to_string(),
            got: raw.to_string(),
        })
    }
}

/// First character of `value` that belongs to [`SHELL_METACHARACTERS`]
pub fn find_metacharacter(value: &str) -> Option<char> {
    value.chars().find(|c| SHELL_METACHARACTERS.contains(c))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Output of sanitize never leaves the token alphabet
        #[test]
        fn prop_sanitize_output_alphabet(input in ".*") {
            let out = sanitize(&input);
            prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'),
                "Unexpected character in: {}", out);
        }

        /// Sanitize is idempotent
        #[test]
        fn prop_sanitize_idempotent(input in ".*") {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }

        /// Strings already inside the alphabet pass through unchanged
        #[test]
        fn prop_sanitize_preserves_tokens(input in "[A-Za-z0-9._-]{0,64}") {
            prop_assert_eq!(sanitize(&input), input);
        }

        /// Injection payloads lose every metacharacter
        #[test]
        fn prop_sanitize_strips_injection(
            base in "[a-z]{1,10}",
            exploit in prop::sample::select(vec![
                ";rm -rf /", "$(whoami)", "`id`", "||true", "&&false", "|cat", ">/dev/null",
            ])
        ) {
            let out = sanitize(&format!("{}{}", base, exploit));
            prop_assert!(find_metacharacter(&out).is_none());
            prop_assert!(!out.contains(' '));
        }

        /// Record values carrying a metacharacter are rejected
        #[test]
        fn prop_record_value_metachar_reject(
            base in "[a-z0-9.]{1,20}",
            metachar in "[;&|`$()<>\\n\\r]"
        ) {
            let value = format!("{}{}x", base, metachar);
            prop_assert!(validate_record_value(&value).is_err());
        }
    }
}
