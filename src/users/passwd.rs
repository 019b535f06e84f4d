/// `/etc/passwd` and `/etc/shadow` readers.
use std::collections::HashSet;

use super::types::SystemUser;

/// Lowest UID handed out to regular accounts
pub const FIRST_REGULAR_UID: u32 = 1000;
/// `nobody`
const OVERFLOW_UID: u32 = 65534;

/// Parse one passwd line; `locked` starts out false
pub fn parse_passwd_line(line: &str) -> Option<SystemUser> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 7 {
        return None;
    }
    Some(SystemUser {
        username: parts[0].to_string(),
        uid: parts[2].parse().ok()?,
        gid: parts[3].parse().ok()?,
        home: parts[5].to_string(),
        shell: parts[6].to_string(),
        locked: false,
    })
}

pub fn is_regular(user: &SystemUser) -> bool {
    user.uid >= FIRST_REGULAR_UID && user.uid != OVERFLOW_UID
}

/// Accounts whose shadow password field starts with `!`
pub fn locked_accounts(shadow: &[String]) -> HashSet<String> {
    shadow
        .iter()
        .filter_map(|line| {
            let mut parts = line.split(':');
            let name = parts.next()?;
            let hash = parts.next()?;
            hash.starts_with('!').then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passwd_line() {
        let user = parse_passwd_line("deploy:x:1001:1001:Deploy,,,:/home/deploy:/bin/bash").unwrap();
        assert_eq!(user.username, "deploy");
        assert_eq!(user.uid, 1001);
        assert_eq!(user.home, "/home/deploy");
        assert_eq!(user.shell, "/bin/bash");
        assert!(is_regular(&user));

        assert!(parse_passwd_line("broken:x:1001").is_none());
        assert!(parse_passwd_line("bad:x:abc:1:::/bin/sh").is_none());
    }

    #[test]
    fn test_system_accounts_not_regular() {
        let daemon = parse_passwd_line("www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin").unwrap();
        let nobody = parse_passwd_line("nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin").unwrap();
        assert!(!is_regular(&daemon));
        assert!(!is_regular(&nobody));
    }

    #[test]
    fn test_locked_accounts() {
        let shadow: Vec<String> = ["deploy:!$6$abc:19000:0:99999:7:::", "web:$6$def:19000::::::", "svc:!*:19000::::::"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let locked = locked_accounts(&shadow);
        assert!(locked.contains("deploy"));
        assert!(locked.contains("svc"));
        assert!(!locked.contains("web"));
    }
}
