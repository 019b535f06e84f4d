/// Process configuration, built once at startup.
///
/// Defaults, then an optional TOML file named by `VPSCTL_CONFIG`, then the
/// environment variables the systemd unit sets.
use crate::common::error::{PanelError, PanelResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PanelConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub commands: CommandConfig,
    pub paths: PathsConfig,
    pub services: ServicesConfig,
    pub mysql: MysqlConfig,
    pub dns: DnsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_bytes: 110 * 1024 * 1024, // uploads plus multipart overhead
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_user: String,
    pub admin_password: String,
    pub jwt_secret: String,
    pub token_lifetime_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_user: "admin".to_string(),
            admin_password: "changeme".to_string(),
            jwt_secret: "change-this-secret-in-production".to_string(),
            token_lifetime_hours: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Elevation wrapper; empty runs commands directly
    pub elevation: String,
    pub timeout_secs: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            elevation: "sudo".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub files_root: PathBuf,
    pub web_root: PathBuf,
    pub home_root: PathBuf,
    pub cron_spool: PathBuf,
    pub system_crontab: PathBuf,
    pub zones_dir: PathBuf,
    pub named_conf: PathBuf,
    pub postfix_domains: PathBuf,
    pub postfix_maps: PathBuf,
    pub dovecot_users: PathBuf,
    pub mail_storage: PathBuf,
    pub vsftpd_userlist: PathBuf,
    pub nginx_available: PathBuf,
    pub nginx_enabled: PathBuf,
    pub passwd: PathBuf,
    pub shadow: PathBuf,
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            files_root: PathBuf::from("/var/www"),
            web_root: PathBuf::from("/var/www"),
            home_root: PathBuf::from("/home"),
            cron_spool: PathBuf::from("/var/spool/cron/crontabs"),
            system_crontab: PathBuf::from("/etc/crontab"),
            zones_dir: PathBuf::from("/etc/bind/zones"),
            named_conf: PathBuf::from("/etc/bind/named.conf.local"),
            postfix_domains: PathBuf::from("/etc/postfix/virtual_mailbox_domains"),
            postfix_maps: PathBuf::from("/etc/postfix/virtual_mailbox_maps"),
            dovecot_users: PathBuf::from("/etc/dovecot/users"),
            mail_storage: PathBuf::from("/var/mail/vhosts"),
            vsftpd_userlist: PathBuf::from("/etc/vsftpd.userlist"),
            nginx_available: PathBuf::from("/etc/nginx/sites-available"),
            nginx_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            passwd: PathBuf::from("/etc/passwd"),
            shadow: PathBuf::from("/etc/shadow"),
            proc_root: PathBuf::from("/proc"),
            os_release: PathBuf::from("/etc/os-release"),
        }
    }
}

impl PathsConfig {
    /// Re-root every path under `root` (sandboxed test trees)
    pub fn rooted_at(root: &Path) -> Self {
        let d = Self::default();
        let under = |p: &Path| root.join(p.strip_prefix("/").unwrap_or(p));
        Self {
            files_root: under(&d.files_root),
            web_root: under(&d.web_root),
            home_root: under(&d.home_root),
            cron_spool: under(&d.cron_spool),
            system_crontab: under(&d.system_crontab),
            zones_dir: under(&d.zones_dir),
            named_conf: under(&d.named_conf),
            postfix_domains: under(&d.postfix_domains),
            postfix_maps: under(&d.postfix_maps),
            dovecot_users: under(&d.dovecot_users),
            mail_storage: under(&d.mail_storage),
            vsftpd_userlist: under(&d.vsftpd_userlist),
            nginx_available: under(&d.nginx_available),
            nginx_enabled: under(&d.nginx_enabled),
            passwd: under(&d.passwd),
            shadow: under(&d.shadow),
            proc_root: under(&d.proc_root),
            os_release: under(&d.os_release),
        }
    }

    fn all(&self) -> [(&'static str, &Path); 18] {
        [
            ("files_root", self.files_root.as_path()),
            ("web_root", self.web_root.as_path()),
            ("home_root", self.home_root.as_path()),
            ("cron_spool", self.cron_spool.as_path()),
            ("system_crontab", self.system_crontab.as_path()),
            ("zones_dir", self.zones_dir.as_path()),
            ("named_conf", self.named_conf.as_path()),
            ("postfix_domains", self.postfix_domains.as_path()),
            ("postfix_maps", self.postfix_maps.as_path()),
            ("dovecot_users", self.dovecot_users.as_path()),
            ("mail_storage", self.mail_storage.as_path()),
            ("vsftpd_userlist", self.vsftpd_userlist.as_path()),
            ("nginx_available", self.nginx_available.as_path()),
            ("nginx_enabled", self.nginx_enabled.as_path()),
            ("passwd", self.passwd.as_path()),
            ("shadow", self.shadow.as_path()),
            ("proc_root", self.proc_root.as_path()),
            ("os_release", self.os_release.as_path()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub bind_unit: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            bind_unit: "named".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MysqlConfig {
    pub user: String,
    pub password: String,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            password: String::new(),
        }
    }
}

/// How the SOA serial is recomputed after a zone edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SerialPolicy {
    /// `YYYYMMDDHH` from local time, even if that is lower than the current serial
    #[default]
    WallClock,
    /// `max(current + 1, YYYYMMDDHH)`
    Monotonic,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    pub serial_policy: SerialPolicy,
}

impl PanelConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PanelResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PanelError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content).map_err(|e| PanelError::Config(e.to_string()))
    }

    /// Defaults, `VPSCTL_CONFIG` file, then process environment
    pub fn load() -> PanelResult<Self> {
        let mut config = match std::env::var("VPSCTL_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> PanelResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| PanelError::Config(format!("PORT is not a port number: {}", port)))?;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = get("ADMIN_USER") {
            self.auth.admin_user = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }
        if let Some(v) = get("MYSQL_USER") {
            self.mysql.user = v;
        }
        if let Some(v) = get("MYSQL_PASSWORD") {
            self.mysql.password = v;
        }
        if let Some(v) = get("BIND_SERVICE") {
            self.services.bind_unit = v;
        }
        if let Some(v) = get("VPSCTL_COMMAND_TIMEOUT") {
            self.commands.timeout_secs = v.parse().map_err(|_| {
                PanelError::Config(format!("VPSCTL_COMMAND_TIMEOUT is not a number: {}", v))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> PanelResult<()> {
        if self.commands.timeout_secs == 0 {
            return Err(PanelError::Config("command timeout must be positive".into()));
        }
        // A command timeout must be reportable before the request itself times out
        if self.commands.timeout_secs >= self.server.request_timeout_secs {
            return Err(PanelError::Config(format!(
                "command timeout ({}s) must be shorter than the request timeout ({}s)",
                self.commands.timeout_secs, self.server.request_timeout_secs
            )));
        }
        if self.auth.token_lifetime_hours <= 0 {
            return Err(PanelError::Config("token lifetime must be positive".into()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(PanelError::Config("jwt secret must not be empty".into()));
        }
        for (name, path) in self.paths.all() {
            if !path.is_absolute() {
                return Err(PanelError::Config(format!(
                    "paths.{} must be absolute: {}",
                    name,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_validate() {
        let config = PanelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.commands.elevation, "sudo");
        assert_eq!(config.services.bind_unit, "named");
        assert_eq!(config.dns.serial_policy, SerialPolicy::WallClock);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("ADMIN_USER", "root-admin"),
            ("BIND_SERVICE", "bind9"),
            ("MYSQL_PASSWORD", "s3cret"),
            ("JWT_SECRET", ""),
        ]
        .into_iter()
        .collect();

        let mut config = PanelConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.admin_user, "root-admin");
        assert_eq!(config.services.bind_unit, "bind9");
        assert_eq!(config.mysql.password, "s3cret");
        // empty values do not override
        assert_eq!(config.auth.jwt_secret, AuthConfig::default().jwt_secret);
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = PanelConfig::default();
        let err = config
            .apply_env(|k| (k == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, PanelError::Config(_)));
    }

    #[test]
    fn test_timeout_ordering_enforced() {
        let mut config = PanelConfig::default();
        config.commands.timeout_secs = 30;
        assert!(config.validate().is_err());
        config.commands.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: PanelConfig = toml::from_str(
            r#"
            [commands]
            elevation = ""

            [dns]
            serial_policy = "monotonic"

            [paths]
            zones_dir = "/srv/bind/zones"
            "#,
        )
        .unwrap();

        assert_eq!(config.commands.elevation, "");
        assert_eq!(config.commands.timeout_secs, 20);
        assert_eq!(config.dns.serial_policy, SerialPolicy::Monotonic);
        assert_eq!(config.paths.zones_dir, PathBuf::from("/srv/bind/zones"));
        assert_eq!(config.paths.named_conf, PathBuf::from("/etc/bind/named.conf.local"));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vpsctl.toml");
        std::fs::write(&path, "[server]\nport = 7000\n").unwrap();
        assert_eq!(PanelConfig::from_file(&path).unwrap().server.port, 7000);
        assert!(PanelConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_relative_path_rejected() {
        let mut config = PanelConfig::default();
        config.paths.zones_dir = PathBuf::from("zones");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rooted_at() {
        let paths = PathsConfig::rooted_at(Path::new("/tmp/sandbox"));
        assert_eq!(paths.cron_spool, PathBuf::from("/tmp/sandbox/var/spool/cron/crontabs"));
    }
}
