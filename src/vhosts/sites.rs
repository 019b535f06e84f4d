use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::reload::Service;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{
    split_email, validate_domain, validate_php_version, PathConfiner, ValidationError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::template::{build_nginx_config, parse_vhost_config, DEFAULT_PHP_VERSION};
use super::types::{CreateVhostArgs, EnableSslArgs, Vhost};

const WEB_OWNER: &str = "www-data:www-data";

/// nginx sites: `<domain>.conf` in sites-available, enabled by a symlink of
/// the same name in sites-enabled
pub struct VhostTools {
    ctx: PanelContext,
}

impl VhostTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    fn config_path(&self, domain: &str) -> PathBuf {
        self.ctx
            .config
            .paths
            .nginx_available
            .join(format!("{}.conf", domain))
    }

    fn link_path(&self, domain: &str) -> PathBuf {
        self.ctx
            .config
            .paths
            .nginx_enabled
            .join(format!("{}.conf", domain))
    }

    pub async fn list(&self) -> PanelResult<Vec<Vhost>> {
        audit_operation(&self.ctx.audit, "list_vhosts", None, || async {
            let mut entries =
                match tokio::fs::read_dir(&self.ctx.config.paths.nginx_available).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                    Err(e) => return Err(e.into()),
                };

            let mut vhosts = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let Some(domain) = name.strip_suffix(".conf") else {
                    continue;
                };
                if entry.file_type().await?.is_dir() {
                    continue;
                }
                let content = tokio::fs::read_to_string(entry.path()).await.unwrap_or_default();
                let mut vhost = parse_vhost_config(domain, &content);
                vhost.enabled = exists(&self.link_path(domain)).await;
                vhosts.push(vhost);
            }
            vhosts.sort_by(|a, b| a.domain.cmp(&b.domain));
            Ok(vhosts)
        })
        .await
    }

    /// Write and enable a server block, keeping it only if `nginx -t` passes
    pub async fn create(&self, args: CreateVhostArgs) -> PanelResult<Vhost> {
        audit_operation(
            &self.ctx.audit,
            "create_vhost",
            Some(serde_json::json!({
                "domain": &args.domain,
                "docroot": &args.docroot,
                "php": &args.php,
                "ssl": args.ssl,
            })),
            || async {
                let domain = validate_domain(&args.domain)?;
                let php = match args.php.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                    Some(p) => validate_php_version(p)?,
                    None => DEFAULT_PHP_VERSION.to_string(),
                };
                let docroot = self.resolve_docroot(&domain, args.docroot.as_deref())?;
                let docroot_arg = docroot.display().to_string();

                let config_path = self.config_path(&domain);
                if exists(&config_path).await {
                    return Err(ValidationError::Duplicate {
                        field: "domain".to_string(),
                        value: domain,
                    }
                    .into());
                }
                let content = build_nginx_config(&domain, &docroot_arg, &php);

                let mut tx = Compensation::new("create_vhost", Arc::clone(&self.ctx.audit));
                tx.run(
                    "server block",
                    self.ctx.store.write(&config_path, &content, Some(0o644)),
                )
                .await?;
                let store = Arc::clone(&self.ctx.store);
                let written = config_path.clone();
                tx.undo_with("server block", move || async move {
                    store.remove_file(&written).await.map(|_| ())
                });

                tx.run("document root", async {
                    self.ctx.gate.run("mkdir", &["-p", &docroot_arg]).await?;
                    self.ctx.gate.run("chown", &[WEB_OWNER, &docroot_arg]).await
                })
                .await?;
                tx.completed("document root");

                let link = self.link_path(&domain);
                let linked = tx.run("enable link", self.link(&config_path, &link)).await?;
                if linked {
                    tx.undo_with("enable link", move || async move {
                        remove_if_present(&link).await
                    });
                } else {
                    tx.completed("enable link");
                }

                tx.run("config test", self.ctx.reload.test_nginx()).await?;

                self.ctx.reload.reload(Service::Nginx).await?;
                if args.ssl {
                    self.request_certificate(&domain, None).await?;
                }

                let mut vhost = parse_vhost_config(&domain, &content);
                vhost.enabled = true;
                vhost.ssl = args.ssl;
                Ok(vhost)
            },
        )
        .await
    }

    /// Remove the server block and its link; the document root stays
    pub async fn delete(&self, domain: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_vhost",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let domain = validate_domain(domain)?;
                self.ctx.audit.log_dangerous_operation(
                    "delete_vhost",
                    true,
                    &format!("Deleting vhost {}", domain),
                );

                let config_path = self.config_path(&domain);
                let saved = match tokio::fs::read_to_string(&config_path).await {
                    Ok(content) => Some(content),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                };

                let mut tx = Compensation::new("delete_vhost", Arc::clone(&self.ctx.audit));
                let removed = tx
                    .run("server block", self.ctx.store.remove_file(&config_path))
                    .await?;
                if let Some(content) = saved {
                    let store = Arc::clone(&self.ctx.store);
                    tx.undo_with("server block", move || async move {
                        store.write(&config_path, &content, Some(0o644)).await
                    });
                }

                let unlinked = tx
                    .run("enable link", remove_existing(&self.link_path(&domain)))
                    .await?;
                if !unlinked && !removed {
                    return Err(PanelError::not_found(format!("vhost {}", domain)));
                }

                self.ctx.reload.reload(Service::Nginx).await
            },
        )
        .await
    }

    pub async fn enable(&self, domain: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "enable_vhost",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let domain = validate_domain(domain)?;
                let config_path = self.require_config(&domain).await?;
                self.link(&config_path, &self.link_path(&domain)).await?;
                self.ctx.reload.reload(Service::Nginx).await
            },
        )
        .await
    }

    pub async fn disable(&self, domain: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "disable_vhost",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let domain = validate_domain(domain)?;
                self.require_config(&domain).await?;
                remove_if_present(&self.link_path(&domain)).await?;
                self.ctx.reload.reload(Service::Nginx).await
            },
        )
        .await
    }

    /// `certbot --nginx` for the domain, registering `email` when given
    pub async fn enable_ssl(&self, domain: &str, args: EnableSslArgs) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "enable_ssl",
            Some(serde_json::json!({"domain": domain, "email": &args.email})),
            || async {
                let domain = validate_domain(domain)?;
                self.require_config(&domain).await?;
                let email = match args.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
                    Some(raw) => {
                        let (local, host) = split_email(raw)?;
                        Some(format!("{}@{}", local, host))
                    }
                    None => None,
                };
                self.request_certificate(&domain, email.as_deref()).await
            },
        )
        .await
    }

    async fn request_certificate(&self, domain: &str, email: Option<&str>) -> PanelResult<()> {
        let mut args = vec!["--nginx", "-d", domain, "--non-interactive", "--agree-tos"];
        match email {
            Some(email) => args.extend(["--email", email]),
            None => args.push("--register-unsafely-without-email"),
        }
        self.ctx.gate.run("certbot", &args).await.map(|_| ())
    }

    async fn require_config(&self, domain: &str) -> PanelResult<PathBuf> {
        let path = self.config_path(domain);
        if exists(&path).await {
            Ok(path)
        } else {
            Err(PanelError::not_found(format!("vhost {}", domain)))
        }
    }

    /// Symlink `link` to `target`; false when the link was already there
    async fn link(&self, target: &Path, link: &Path) -> PanelResult<bool> {
        if tokio::fs::symlink_metadata(link).await.is_ok() {
            return Ok(false);
        }
        if let Some(dir) = link.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::symlink(target, link).await?;
        Ok(true)
    }

    fn resolve_docroot(&self, domain: &str, requested: Option<&str>) -> PanelResult<PathBuf> {
        let confiner = PathConfiner::new(&self.ctx.config.paths.web_root);
        let docroot = match requested.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => confiner.rebase(d)?,
            None => confiner.confine(&format!("{}/public_html", domain))?,
        };
        if confiner.is_root(&docroot) {
            return Err(PanelError::forbidden("the web root cannot be a document root"));
        }
        Ok(docroot)
    }
}

impl PanelModule for VhostTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "VhostTools"
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Remove a file or link; true if something was removed
async fn remove_existing(path: &Path) -> PanelResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_present(path: &Path) -> PanelResult<()> {
    remove_existing(path).await.map(|_| ())
}
