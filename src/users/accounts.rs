use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{
    sanitized_token, validate_password, validate_shell, validate_username, ValidationError,
};
use std::sync::Arc;

use super::passwd::{is_regular, locked_accounts, parse_passwd_line};
use super::types::{CreateUserArgs, SystemUser, UpdateUserArgs};

const DEFAULT_SHELL: &str = "/bin/bash";

/// Regular Linux accounts (UID 1000 and up).
///
/// Mutations refuse `root` with Forbidden and never touch system accounts.
pub struct UserTools {
    ctx: PanelContext,
}

impl UserTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> PanelResult<Vec<SystemUser>> {
        audit_operation(&self.ctx.audit, "list_users", None, || async {
            self.regular_users().await
        })
        .await
    }

    /// `useradd -m` then `chpasswd`; a failed password step removes the account.
    ///
    /// Returns the sanitized username.
    pub async fn create(&self, args: CreateUserArgs) -> PanelResult<String> {
        audit_operation(
            &self.ctx.audit,
            "create_user",
            Some(serde_json::json!({
                "username": &args.username,
                "shell": &args.shell,
                "groups": &args.groups,
            })),
            || async {
                let username = account_name(&args.username)?;
                validate_password(&args.password)?;
                let shell = match args.shell.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    Some(s) => {
                        validate_shell(s)?;
                        s.to_string()
                    }
                    None => DEFAULT_SHELL.to_string(),
                };
                let groups = parse_groups(args.groups.as_deref())?;

                let mut useradd: Vec<&str> = Vec::new();
                if !groups.is_empty() {
                    useradd.extend(["-G", groups.as_str()]);
                }
                useradd.extend(["-m", "-s", shell.as_str(), username.as_str()]);

                let mut tx = Compensation::new("create_user", Arc::clone(&self.ctx.audit));
                tx.run("account", self.ctx.gate.run("useradd", &useradd))
                    .await?;
                let gate = Arc::clone(&self.ctx.gate);
                let account = username.clone();
                tx.undo_with("account", move || async move {
                    gate.run("userdel", &["-r", &account]).await.map(|_| ())
                });

                tx.run("password", self.set_password(&username, &args.password))
                    .await?;
                Ok(username)
            },
        )
        .await
    }

    /// Change password and/or login shell
    pub async fn update(&self, username: &str, args: UpdateUserArgs) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "update_user",
            Some(serde_json::json!({"username": username, "shell": &args.shell})),
            || async {
                let username = account_name(username)?;
                let password = args.password.as_deref().filter(|p| !p.is_empty());
                let shell = args.shell.as_deref().map(str::trim).filter(|s| !s.is_empty());
                if let Some(p) = password {
                    validate_password(p)?;
                }
                if let Some(s) = shell {
                    validate_shell(s)?;
                }
                self.require_regular(&username).await?;

                if let Some(p) = password {
                    self.set_password(&username, p).await?;
                }
                if let Some(s) = shell {
                    self.ctx.gate.run("usermod", &["-s", s, &username]).await?;
                }
                Ok(())
            },
        )
        .await
    }

    /// `userdel -r`: the home directory goes too
    pub async fn delete(&self, username: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_user",
            Some(serde_json::json!({"username": username})),
            || async {
                let username = account_name(username)?;
                self.require_regular(&username).await?;
                self.ctx.audit.log_dangerous_operation(
                    "delete_user",
                    true,
                    &format!("Deleting account {} and its home directory", username),
                );
                self.ctx
                    .gate
                    .run("userdel", &["-r", &username])
                    .await
                    .map(|_| ())
            },
        )
        .await
    }

    /// Lock the password (`usermod -L`)
    pub async fn suspend(&self, username: &str) -> PanelResult<()> {
        self.set_locked("suspend_user", username, true).await
    }

    pub async fn activate(&self, username: &str) -> PanelResult<()> {
        self.set_locked("activate_user", username, false).await
    }

    async fn set_locked(&self, operation: &str, username: &str, lock: bool) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            operation,
            Some(serde_json::json!({"username": username})),
            || async {
                let username = account_name(username)?;
                self.require_regular(&username).await?;
                let flag = if lock { "-L" } else { "-U" };
                self.ctx
                    .gate
                    .run("usermod", &[flag, &username])
                    .await
                    .map(|_| ())
            },
        )
        .await
    }

    async fn set_password(&self, username: &str, password: &str) -> PanelResult<()> {
        let secret = format!("{}:{}\n", username, password);
        self.ctx
            .gate
            .run_with_stdin("chpasswd", &[], secret.as_bytes())
            .await
            .map(|_| ())
    }

    async fn regular_users(&self) -> PanelResult<Vec<SystemUser>> {
        let paths = &self.ctx.config.paths;
        let passwd = self.ctx.store.read_lines(&paths.passwd).await?;
        // shadow is unreadable without privileges
        let locked = match self.ctx.store.read_lines(&paths.shadow).await {
            Ok(lines) => locked_accounts(&lines),
            Err(e) => {
                tracing::debug!(error = %e, "shadow file unreadable, lock state unknown");
                Default::default()
            }
        };

        Ok(passwd
            .iter()
            .filter_map(|line| parse_passwd_line(line))
            .filter(is_regular)
            .map(|mut user| {
                user.locked = locked.contains(&user.username);
                user
            })
            .collect())
    }

    async fn require_regular(&self, username: &str) -> PanelResult<SystemUser> {
        let passwd = self.ctx.store.read_lines(&self.ctx.config.paths.passwd).await?;
        let user = passwd
            .iter()
            .filter_map(|line| parse_passwd_line(line))
            .find(|u| u.username == username)
            .ok_or_else(|| PanelError::not_found(format!("user {}", username)))?;
        if !is_regular(&user) {
            return Err(PanelError::forbidden(format!("{} is a system account", username)));
        }
        Ok(user)
    }
}

impl PanelModule for UserTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "UserTools"
    }
}

fn account_name(raw: &str) -> PanelResult<String> {
    let username = validate_username(raw)?;
    if username == "root" {
        return Err(PanelError::forbidden("the root account is protected"));
    }
    Ok(username)
}

/// Comma-separated group list, each name sanitized
fn parse_groups(raw: Option<&str>) -> Result<String, ValidationError> {
    let Some(raw) = raw else {
        return Ok(String::new());
    };
    let groups = raw
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(|g| sanitized_token("groups", g))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_name() {
        assert!(matches!(account_name("root"), Err(PanelError::Forbidden(_))));
        assert_eq!(account_name("deploy").unwrap(), "deploy");
        assert!(matches!(
            account_name("a-very-long-username-that-exceeds-limits"),
            Err(PanelError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_groups() {
        assert_eq!(parse_groups(None).unwrap(), "");
        assert_eq!(parse_groups(Some("www-data, adm")).unwrap(), "www-data,adm");
        assert_eq!(parse_groups(Some("sudo;id")).unwrap(), "sudoid");
        assert_eq!(parse_groups(Some(",,")).unwrap(), "");
        assert!(parse_groups(Some("$()")).is_err());
    }
}
