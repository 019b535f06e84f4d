use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::line_store::RecordFilter;
use crate::common::panel_module::PanelModule;
use crate::common::reload::Service;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{validate_password, validate_username, PathConfiner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{CreateFtpUserArgs, FtpPasswordArgs, FtpUser};

const FTP_SHELL: &str = "/usr/sbin/nologin";

/// FTP-only system accounts listed in the vsftpd user list
pub struct FtpTools {
    ctx: PanelContext,
}

impl FtpTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    pub async fn list_users(&self) -> PanelResult<Vec<FtpUser>> {
        audit_operation(&self.ctx.audit, "list_ftp_users", None, || async {
            let paths = &self.ctx.config.paths;
            let mut users = Vec::new();
            for rec in self
                .ctx
                .store
                .records(&paths.vsftpd_userlist, RecordFilter::Plain)
                .await?
            {
                let username = rec.line.trim().to_string();
                let system_home = paths.home_root.join(&username);
                let home = if is_dir(&system_home).await {
                    system_home
                } else {
                    paths.web_root.join(&username)
                };
                users.push(FtpUser {
                    home_dir: home.display().to_string(),
                    username,
                    active: true,
                });
            }
            Ok(users)
        })
        .await
    }

    /// Create a nologin account rooted in the web tree and allow it in vsftpd
    pub async fn create_user(&self, args: CreateFtpUserArgs) -> PanelResult<FtpUser> {
        audit_operation(
            &self.ctx.audit,
            "create_ftp_user",
            Some(serde_json::json!({"username": &args.username, "home_dir": &args.home_dir})),
            || async {
                let username = ftp_username(&args.username)?;
                validate_password(&args.password)?;
                let paths = &self.ctx.config.paths;
                let home = resolve_home(&paths.web_root, &username, args.home_dir.as_deref())?;
                let home_arg = home.display().to_string();
                let home_existed = is_dir(&home).await;

                let mut tx = Compensation::new("create_ftp_user", Arc::clone(&self.ctx.audit));
                tx.run(
                    "system account",
                    self.ctx.gate.run(
                        "useradd",
                        &["-m", "-d", &home_arg, "-s", FTP_SHELL, &username],
                    ),
                )
                .await?;
                let gate = Arc::clone(&self.ctx.gate);
                let account = username.clone();
                tx.undo_with("system account", move || async move {
                    // a pre-existing home directory is left alone
                    let removed = if home_existed {
                        gate.run("userdel", &[&account]).await
                    } else {
                        gate.run("userdel", &["-r", &account]).await
                    };
                    removed.map(|_| ())
                });

                let secret = format!("{}:{}\n", username, args.password);
                tx.run(
                    "password",
                    self.ctx.gate.run_with_stdin("chpasswd", &[], secret.as_bytes()),
                )
                .await?;
                tx.completed("password");

                let owner = format!("{}:{}", username, username);
                tx.run("ownership", self.ctx.gate.run("chown", &[&owner, &home_arg]))
                    .await?;
                tx.completed("ownership");

                tx.run(
                    "user list",
                    self.ctx.store.append(&paths.vsftpd_userlist, &username),
                )
                .await?;

                self.ctx.reload.reload(Service::Vsftpd).await?;
                Ok(FtpUser {
                    username,
                    home_dir: home_arg,
                    active: true,
                })
            },
        )
        .await
    }

    /// Remove the account but keep its files
    pub async fn delete_user(&self, username: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_ftp_user",
            Some(serde_json::json!({"username": username})),
            || async {
                let username = ftp_username(username)?;
                self.require_listed(&username).await?;
                self.ctx.audit.log_dangerous_operation(
                    "delete_ftp_user",
                    true,
                    &format!("Deleting FTP account {}", username),
                );

                let userlist = self.ctx.config.paths.vsftpd_userlist.clone();
                let mut tx = Compensation::new("delete_ftp_user", Arc::clone(&self.ctx.audit));
                tx.run(
                    "user list",
                    self.ctx
                        .store
                        .remove_matching(&userlist, |l| l.trim() == username),
                )
                .await?;
                let store = Arc::clone(&self.ctx.store);
                let entry = username.clone();
                tx.undo_with("user list", move || async move {
                    store.append(&userlist, &entry).await
                });

                tx.run("system account", self.ctx.gate.run("userdel", &[&username]))
                    .await?;

                self.ctx.reload.reload(Service::Vsftpd).await
            },
        )
        .await
    }

    pub async fn update_password(&self, username: &str, args: FtpPasswordArgs) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "update_ftp_password",
            Some(serde_json::json!({"username": username})),
            || async {
                let username = ftp_username(username)?;
                validate_password(&args.password)?;
                self.require_listed(&username).await?;

                let secret = format!("{}:{}\n", username, args.password);
                self.ctx
                    .gate
                    .run_with_stdin("chpasswd", &[], secret.as_bytes())
                    .await
                    .map(|_| ())
            },
        )
        .await
    }

    async fn require_listed(&self, username: &str) -> PanelResult<()> {
        let listed = self
            .ctx
            .store
            .records(&self.ctx.config.paths.vsftpd_userlist, RecordFilter::Plain)
            .await?
            .iter()
            .any(|rec| rec.line.trim() == username);
        if listed {
            Ok(())
        } else {
            Err(PanelError::not_found(format!("FTP user {}", username)))
        }
    }
}

impl PanelModule for FtpTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "FtpTools"
    }
}

fn ftp_username(raw: &str) -> PanelResult<String> {
    let username = validate_username(raw)?;
    if username == "root" {
        return Err(PanelError::forbidden("the root account cannot be an FTP user"));
    }
    Ok(username)
}

/// Home directory confined under the web root.
///
/// An absolute request already under the web root is taken relative to it;
/// anything else is treated as relative. The web root itself is refused.
fn resolve_home(web_root: &Path, username: &str, requested: Option<&str>) -> PanelResult<PathBuf> {
    let confiner = PathConfiner::new(web_root);
    let home = match requested.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => confiner.rebase(h)?,
        None => confiner.confine(username)?,
    };
    if confiner.is_root(&home) {
        return Err(PanelError::forbidden("the web root cannot be a home directory"));
    }
    Ok(home)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
