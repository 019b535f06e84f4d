// Line formats of the Postfix map and Dovecot passwd files.

/// Dovecot scheme prefix for stored credentials
pub const CREDENTIAL_SCHEME: &str = "{ARGON2ID}";
pub const DEFAULT_QUOTA: &str = "1G";

/// `virtual_mailbox_maps` line: `email domain/user/`
pub fn map_line(local: &str, domain: &str) -> String {
    format!("{}@{} {}/{}/", local, domain, domain, local)
}

/// Dovecot passwd-file line carrying the hash and the storage quota
pub fn credential_line(email: &str, phc_hash: &str, quota: &str) -> String {
    format!(
        "{}:{}{}:::::userdb_quota_rule=*:storage={}",
        email, CREDENTIAL_SCHEME, phc_hash, quota
    )
}

/// Address heading a map or credential line
pub fn address_of(line: &str) -> &str {
    line.trim_start()
        .split(|c: char| c.is_whitespace() || c == ':')
        .next()
        .unwrap_or("")
}

/// Domain part of the address heading a line, if it is an address
pub fn domain_of(line: &str) -> Option<&str> {
    address_of(line).split_once('@').map(|(_, d)| d)
}

pub fn belongs_to(line: &str, domain: &str) -> bool {
    domain_of(line).is_some_and(|d| d.eq_ignore_ascii_case(domain))
}

/// `storage=` rule of a credential line
pub fn quota_of(line: &str) -> Option<&str> {
    line.split(':')
        .filter_map(|field| field.split_once("storage="))
        .map(|(_, quota)| quota.split_whitespace().next().unwrap_or(quota))
        .next()
}

/// Maildir column of a map line
pub fn maildir_of(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_line() {
        assert_eq!(map_line("info", "example.com"), "info@example.com example.com/info/");
    }

    #[test]
    fn test_credential_line() {
        let line = credential_line("info@example.com", "$argon2id$v=19$abc", "2G");
        assert_eq!(
            line,
            "info@example.com:{ARGON2ID}$argon2id$v=19$abc:::::userdb_quota_rule=*:storage=2G"
        );
        assert_eq!(address_of(&line), "info@example.com");
        assert_eq!(quota_of(&line), Some("2G"));
    }

    #[test]
    fn test_domain_match_is_exact() {
        let line = "a@old.com old.com/a/";
        assert!(belongs_to(line, "old.com"));
        assert!(belongs_to(line, "OLD.com"));
        assert!(!belongs_to("a@old.community old.community/a/", "old.com"));
        assert!(!belongs_to("old.com", "old.com"));
    }

    #[test]
    fn test_maildir_of() {
        assert_eq!(maildir_of("a@x.com x.com/a/"), Some("x.com/a/"));
        assert_eq!(maildir_of("a@x.com"), None);
        assert_eq!(quota_of("a@x.com:{PLAIN}pw:::::"), None);
    }
}
