use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::line_store::{LineStore, RecordFilter};
use crate::common::panel_module::PanelModule;
use crate::common::reload::Service;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{
    confine, hash_password, split_email, validate_domain, validate_password, validate_quota,
    ValidationError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::maps::{
    address_of, belongs_to, credential_line, map_line, maildir_of, quota_of, DEFAULT_QUOTA,
};
use super::types::{AddDomainArgs, CreateMailboxArgs, MailDomain, MailQueue, Mailbox};

const VMAIL_OWNER: &str = "vmail:vmail";

/// Postfix virtual domains and Dovecot mailboxes.
///
/// Hosted domains live one per line in `paths.postfix_domains`, mailboxes in
/// `paths.postfix_maps` (compiled with `postmap`) and their credentials in
/// `paths.dovecot_users`.
pub struct MailTools {
    ctx: PanelContext,
}

impl MailTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    pub async fn list_domains(&self) -> PanelResult<Vec<MailDomain>> {
        audit_operation(&self.ctx.audit, "list_mail_domains", None, || async {
            let paths = &self.ctx.config.paths;
            let domains = self
                .ctx
                .store
                .records(&paths.postfix_domains, RecordFilter::Plain)
                .await?;
            let maps = self.ctx.store.read_lines(&paths.postfix_maps).await?;

            Ok(domains
                .into_iter()
                .map(|rec| {
                    let domain = rec.line.trim().to_string();
                    let mailboxes = maps.iter().filter(|l| belongs_to(l, &domain)).count();
                    MailDomain { domain, mailboxes }
                })
                .collect())
        })
        .await
    }

    /// Register a domain and create its storage directory
    pub async fn add_domain(&self, args: AddDomainArgs) -> PanelResult<MailDomain> {
        audit_operation(
            &self.ctx.audit,
            "add_mail_domain",
            Some(serde_json::json!({"domain": &args.domain})),
            || async {
                let domain = validate_domain(&args.domain)?;
                let paths = &self.ctx.config.paths;
                let storage = path_arg(&confine(&paths.mail_storage, &domain)?);

                let added = self
                    .ctx
                    .store
                    .append_unless(&paths.postfix_domains, &domain, |l| {
                        l.trim().eq_ignore_ascii_case(&domain)
                    })
                    .await?;
                if !added {
                    return Err(ValidationError::Duplicate {
                        field: "domain".to_string(),
                        value: domain,
                    }
                    .into());
                }

                let mut tx = Compensation::new("add_mail_domain", Arc::clone(&self.ctx.audit));
                let store = Arc::clone(&self.ctx.store);
                let domains_file = paths.postfix_domains.clone();
                let entry = domain.clone();
                tx.undo_with("domain entry", move || async move {
                    store
                        .remove_matching(&domains_file, |l| l.trim() == entry)
                        .await
                        .map(|_| ())
                });

                tx.run("storage", async {
                    self.ctx.gate.run("mkdir", &["-p", &storage]).await?;
                    self.ctx.gate.run("chown", &["-R", VMAIL_OWNER, &storage]).await
                })
                .await?;

                self.ctx.reload.reload(Service::Postfix).await?;
                Ok(MailDomain {
                    domain,
                    mailboxes: 0,
                })
            },
        )
        .await
    }

    /// Drop a domain with all of its mailboxes, optionally purging stored mail
    pub async fn delete_domain(&self, domain: &str, purge_storage: bool) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_mail_domain",
            Some(serde_json::json!({"domain": domain, "purge_storage": purge_storage})),
            || async {
                let domain = validate_domain(domain)?;
                let paths = &self.ctx.config.paths;
                self.ctx.audit.log_dangerous_operation(
                    "delete_mail_domain",
                    true,
                    &format!("Deleting mail domain {} (purge: {})", domain, purge_storage),
                );

                let storage = path_arg(&confine(&paths.mail_storage, &domain)?);

                let mut tx = Compensation::new("delete_mail_domain", Arc::clone(&self.ctx.audit));
                let domain_lines = tx
                    .run(
                        "domain entry",
                        self.ctx.store.take_matching(&paths.postfix_domains, |l| {
                            l.trim().eq_ignore_ascii_case(&domain)
                        }),
                    )
                    .await?;
                self.restore_on_undo(&mut tx, "domain entry", &paths.postfix_domains, domain_lines.clone());

                let map_lines = tx
                    .run(
                        "map entries",
                        self.ctx
                            .store
                            .take_matching(&paths.postfix_maps, |l| belongs_to(l, &domain)),
                    )
                    .await?;
                self.restore_on_undo(&mut tx, "map entries", &paths.postfix_maps, map_lines.clone());

                if domain_lines.is_empty() && map_lines.is_empty() {
                    return Err(PanelError::not_found(format!("mail domain {}", domain)));
                }

                let credential_lines = tx
                    .run(
                        "credentials",
                        self.ctx
                            .store
                            .take_matching(&paths.dovecot_users, |l| belongs_to(l, &domain)),
                    )
                    .await?;
                self.restore_on_undo(&mut tx, "credentials", &paths.dovecot_users, credential_lines);

                tx.run("map compile", self.compile_maps()).await?;

                // nothing after the purge can be undone, so it runs last
                if purge_storage {
                    if let Err(e) = self.ctx.gate.run("rm", &["-rf", &storage]).await {
                        return Err(PanelError::PartialFailure {
                            operation: "delete_mail_domain".to_string(),
                            completed: tx.steps(),
                            failed_step: "storage purge".to_string(),
                            reason: e.to_string(),
                        });
                    }
                }

                self.ctx.reload.reload(Service::Postfix).await
            },
        )
        .await
    }

    /// Mailboxes of one domain, or of every domain
    pub async fn list_mailboxes(&self, domain: Option<&str>) -> PanelResult<Vec<Mailbox>> {
        audit_operation(
            &self.ctx.audit,
            "list_mailboxes",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let filter = match domain.filter(|d| !d.is_empty()) {
                    Some(d) => Some(validate_domain(d)?),
                    None => None,
                };
                let paths = &self.ctx.config.paths;

                let credentials = self.ctx.store.read_lines(&paths.dovecot_users).await?;
                let quotas: HashMap<&str, &str> = credentials
                    .iter()
                    .filter_map(|l| Some((address_of(l), quota_of(l)?)))
                    .collect();

                let maps = self
                    .ctx
                    .store
                    .records(&paths.postfix_maps, RecordFilter::Plain)
                    .await?;

                Ok(maps
                    .iter()
                    .filter_map(|rec| {
                        let email = address_of(&rec.line);
                        let (_, mailbox_domain) = email.split_once('@')?;
                        if let Some(wanted) = &filter {
                            if !mailbox_domain.eq_ignore_ascii_case(wanted) {
                                return None;
                            }
                        }
                        Some(Mailbox {
                            email: email.to_string(),
                            domain: mailbox_domain.to_string(),
                            maildir: maildir_of(&rec.line).unwrap_or_default().to_string(),
                            quota: quotas.get(email).map(|q| q.to_string()),
                        })
                    })
                    .collect())
            },
        )
        .await
    }

    /// Map the address, build its maildir, store the credential and recompile.
    ///
    /// Any failing step undoes the ones before it.
    pub async fn create_mailbox(&self, args: CreateMailboxArgs) -> PanelResult<Mailbox> {
        audit_operation(
            &self.ctx.audit,
            "create_mailbox",
            Some(serde_json::json!({"email": &args.email, "quota": &args.quota})),
            || async {
                let (local, domain) = split_email(&args.email)?;
                validate_password(&args.password)?;
                let quota = match args.quota.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
                    Some(q) => validate_quota(q)?,
                    None => DEFAULT_QUOTA.to_string(),
                };
                let email = format!("{}@{}", local, domain);
                let paths = &self.ctx.config.paths;

                if !self.is_hosted(&domain).await? {
                    return Err(PanelError::not_found(format!("mail domain {}", domain)));
                }
                let hash = hash_password(&args.password)?;
                let maildir = confine(&paths.mail_storage, &format!("{}/{}", domain, local))?;
                let domain_storage = confine(&paths.mail_storage, &domain)?;
                let maildir_existed = tokio::fs::try_exists(&maildir).await.unwrap_or(false);

                let line = map_line(&local, &domain);
                let added = self
                    .ctx
                    .store
                    .append_unless(&paths.postfix_maps, &line, |l| address_of(l) == email)
                    .await?;
                if !added {
                    return Err(ValidationError::Duplicate {
                        field: "email".to_string(),
                        value: email,
                    }
                    .into());
                }

                let mut tx = Compensation::new("create_mailbox", Arc::clone(&self.ctx.audit));
                let (store, file, address) =
                    (Arc::clone(&self.ctx.store), paths.postfix_maps.clone(), email.clone());
                tx.undo_with("map entry", move || async move {
                    remove_address(&store, &file, &address).await
                });

                let subdirs: Vec<String> = ["cur", "new", "tmp"]
                    .iter()
                    .map(|d| path_arg(&maildir.join(d)))
                    .collect();
                tx.run("maildir", async {
                    let mut mkdir_args = vec!["-p"];
                    mkdir_args.extend(subdirs.iter().map(String::as_str));
                    self.ctx.gate.run("mkdir", &mkdir_args).await?;
                    self.ctx
                        .gate
                        .run("chown", &["-R", VMAIL_OWNER, &path_arg(&domain_storage)])
                        .await
                })
                .await?;
                if maildir_existed {
                    tx.completed("maildir");
                } else {
                    let gate = Arc::clone(&self.ctx.gate);
                    let dir = path_arg(&maildir);
                    tx.undo_with("maildir", move || async move {
                        gate.run("rm", &["-rf", &dir]).await.map(|_| ())
                    });
                }

                let credential = credential_line(&email, &hash, &quota);
                tx.run(
                    "credentials",
                    self.ctx.store.append_private(&paths.dovecot_users, &credential),
                )
                .await?;
                let (store, file, address) =
                    (Arc::clone(&self.ctx.store), paths.dovecot_users.clone(), email.clone());
                tx.undo_with("credentials", move || async move {
                    remove_address(&store, &file, &address).await
                });

                tx.run("map compile", self.compile_maps()).await?;

                self.ctx.reload.reload(Service::Postfix).await?;
                Ok(Mailbox {
                    email,
                    maildir: format!("{}/{}/", domain, local),
                    domain,
                    quota: Some(quota),
                })
            },
        )
        .await
    }

    /// Remove the map and credential entries of exactly this address.
    ///
    /// Stored mail is left on disk.
    pub async fn delete_mailbox(&self, email: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_mailbox",
            Some(serde_json::json!({"email": email})),
            || async {
                let (local, domain) = split_email(email)?;
                let email = format!("{}@{}", local, domain);
                let paths = &self.ctx.config.paths;

                let mut tx = Compensation::new("delete_mailbox", Arc::clone(&self.ctx.audit));
                let map_lines = tx
                    .run(
                        "map entry",
                        self.ctx
                            .store
                            .take_matching(&paths.postfix_maps, |l| address_of(l) == email),
                    )
                    .await?;
                if map_lines.is_empty() {
                    return Err(PanelError::not_found(format!("mailbox {}", email)));
                }
                self.restore_on_undo(&mut tx, "map entry", &paths.postfix_maps, map_lines);

                let credential_lines = tx
                    .run(
                        "credentials",
                        self.ctx
                            .store
                            .take_matching(&paths.dovecot_users, |l| address_of(l) == email),
                    )
                    .await?;
                self.restore_on_undo(&mut tx, "credentials", &paths.dovecot_users, credential_lines);

                tx.run("map compile", self.compile_maps()).await?;
                self.ctx.reload.reload(Service::Postfix).await
            },
        )
        .await
    }

    /// Raw `postqueue -p` listing
    pub async fn queue(&self) -> PanelResult<MailQueue> {
        audit_operation(&self.ctx.audit, "mail_queue", None, || async {
            let queue = self.ctx.gate.run("postqueue", &["-p"]).await?;
            Ok(MailQueue { queue })
        })
        .await
    }

    pub async fn flush_queue(&self) -> PanelResult<()> {
        audit_operation(&self.ctx.audit, "flush_mail_queue", None, || async {
            self.ctx.gate.run("postqueue", &["-f"]).await.map(|_| ())
        })
        .await
    }

    async fn is_hosted(&self, domain: &str) -> PanelResult<bool> {
        let domains = self
            .ctx
            .store
            .records(&self.ctx.config.paths.postfix_domains, RecordFilter::Plain)
            .await?;
        Ok(domains
            .iter()
            .any(|rec| rec.line.trim().eq_ignore_ascii_case(domain)))
    }

    /// Undo for a step that took `lines` out of `file`
    fn restore_on_undo(
        &self,
        tx: &mut Compensation<'_>,
        step: &str,
        file: &Path,
        lines: Vec<String>,
    ) {
        let store = Arc::clone(&self.ctx.store);
        let file = file.to_path_buf();
        tx.undo_with(step, move || async move { store.restore(&file, &lines).await });
    }

    async fn compile_maps(&self) -> PanelResult<()> {
        let maps = path_arg(&self.ctx.config.paths.postfix_maps);
        self.ctx.gate.run("postmap", &[&maps]).await.map(|_| ())
    }
}

impl PanelModule for MailTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "MailTools"
    }
}

async fn remove_address(store: &LineStore, file: &Path, email: &str) -> PanelResult<()> {
    store
        .remove_matching(file, |l| address_of(l) == email)
        .await
        .map(|_| ())
}

/// Paths travel to the gatekeeper as plain argv strings
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
