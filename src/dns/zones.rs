use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::reload::Service;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{
    validate_domain, validate_ip_address, validate_record_name, validate_record_value,
    ValidationError,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::types::{AddRecordArgs, CreateZoneArgs, DeleteRecordArgs, RecordChange, ZoneSummary};
use super::zone::{
    build_zone_file, bump_serial, current_serial, format_record_line, has_zone_block, next_serial,
    parse_record_line, parse_zone, record_matches, remove_zone_block, serial_from_time,
    zone_block, DnsZone, ZoneRecord, ALLOWED_RECORD_TYPES, DEFAULT_TTL,
};

/// BIND zone management.
///
/// Zone files live in `paths.zones_dir` as `<domain>.db` and are registered in
/// `paths.named_conf`. Every structural edit bumps the SOA serial and reloads
/// the BIND unit.
pub struct DnsTools {
    ctx: PanelContext,
}

impl DnsTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    fn zone_path(&self, domain: &str) -> PathBuf {
        self.ctx
            .config
            .paths
            .zones_dir
            .join(format!("{}.db", domain))
    }

    pub async fn list_zones(&self) -> PanelResult<Vec<ZoneSummary>> {
        audit_operation(&self.ctx.audit, "list_zones", None, || async {
            let mut entries = match tokio::fs::read_dir(&self.ctx.config.paths.zones_dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut zones = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Some(domain) = name.strip_suffix(".db") {
                    zones.push(ZoneSummary {
                        domain: domain.to_string(),
                    });
                }
            }
            zones.sort_by(|a, b| a.domain.cmp(&b.domain));
            Ok(zones)
        })
        .await
    }

    pub async fn get_zone(&self, domain: &str) -> PanelResult<DnsZone> {
        audit_operation(
            &self.ctx.audit,
            "get_zone",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let domain = validate_domain(domain)?;
                let content = tokio::fs::read_to_string(self.zone_path(&domain))
                    .await
                    .map_err(|e| zone_io_error(&domain, e.into()))?;
                Ok(parse_zone(&domain, &content))
            },
        )
        .await
    }

    /// Write the zone template, register it with BIND and reload.
    ///
    /// An existing zone file for the domain is overwritten, and put back if
    /// registration fails.
    pub async fn create_zone(&self, args: CreateZoneArgs) -> PanelResult<DnsZone> {
        audit_operation(
            &self.ctx.audit,
            "create_zone",
            Some(serde_json::json!({"domain": &args.domain, "ip": &args.ip})),
            || async {
                let domain = validate_domain(&args.domain)?;
                let ip = validate_ip_address(&args.ip)?;
                if !ip.is_ipv4() {
                    return Err(ValidationError::InvalidFormat {
                        field: "ip".to_string(),
                        expected: "IPv4 address".to_string(),
                        got: ip.to_string(),
                    }
                    .into());
                }

                let paths = &self.ctx.config.paths;
                tokio::fs::create_dir_all(&paths.zones_dir).await?;

                let zone_file = self.zone_path(&domain);
                let previous = read_if_present(&zone_file).await?;
                let serial = serial_from_time(self.ctx.clock.now());
                let content = build_zone_file(&domain, &ip.to_string(), &serial);

                let mut tx = Compensation::new("create_zone", Arc::clone(&self.ctx.audit));
                tx.run(
                    "zone file",
                    self.ctx.store.write(&zone_file, &content, Some(0o644)),
                )
                .await?;
                let store = Arc::clone(&self.ctx.store);
                let path = zone_file.clone();
                tx.undo_with("zone file", move || async move {
                    match previous {
                        Some(old) => store.write(&path, &old, None).await,
                        None => store.remove_file(&path).await.map(|_| ()),
                    }
                });

                let block = zone_block(&domain, &zone_file.display().to_string());
                tx.run(
                    "named.conf entry",
                    self.ctx.store.edit(&paths.named_conf, |lines| {
                        if !has_zone_block(lines, &domain) {
                            lines.extend(block.split('\n').map(str::to_string));
                        }
                    }),
                )
                .await?;

                self.ctx.reload.reload(Service::Bind).await?;
                Ok(parse_zone(&domain, &content))
            },
        )
        .await
    }

    /// Remove the zone file and its `named.conf` block, then reload
    pub async fn delete_zone(&self, domain: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "delete_zone",
            Some(serde_json::json!({"domain": domain})),
            || async {
                let domain = validate_domain(domain)?;
                self.ctx.audit.log_dangerous_operation(
                    "delete_zone",
                    true,
                    &format!("Deleting DNS zone {}", domain),
                );

                let zone_file = self.zone_path(&domain);
                let previous = read_if_present(&zone_file).await?;

                let mut tx = Compensation::new("delete_zone", Arc::clone(&self.ctx.audit));
                tx.run("zone file", self.ctx.store.remove_file(&zone_file))
                    .await?;
                if let Some(old) = previous.clone() {
                    let store = Arc::clone(&self.ctx.store);
                    tx.undo_with("zone file", move || async move {
                        store.write(&zone_file, &old, Some(0o644)).await
                    });
                }

                let removed_block = tx
                    .run(
                        "named.conf entry",
                        self.ctx
                            .store
                            .edit(&self.ctx.config.paths.named_conf, |lines| {
                                remove_zone_block(lines, &domain)
                            }),
                    )
                    .await?;

                if previous.is_none() && !removed_block {
                    return Err(PanelError::not_found(format!("zone {}", domain)));
                }

                self.ctx.reload.reload(Service::Bind).await
            },
        )
        .await
    }

    /// Append one record and bump the serial in a single locked edit
    pub async fn add_record(&self, domain: &str, args: AddRecordArgs) -> PanelResult<RecordChange> {
        audit_operation(
            &self.ctx.audit,
            "add_record",
            Some(serde_json::json!({
                "domain": domain,
                "name": &args.name,
                "type": &args.record_type,
            })),
            || async {
                let domain = validate_domain(domain)?;
                let record_type = validate_record_type(&args.record_type)?;
                let record = ZoneRecord {
                    name: validate_record_name(&args.name)?,
                    ttl: Some(args.ttl.unwrap_or(DEFAULT_TTL)),
                    record_type,
                    value: validate_record_value(&args.value)?,
                };
                let line = format_record_line(&record);

                let now = self.ctx.clock.now();
                let policy = self.ctx.config.dns.serial_policy;
                let serial = self
                    .ctx
                    .store
                    .edit_text(&self.zone_path(&domain), |content| {
                        let mut updated = content.to_string();
                        if !updated.is_empty() && !updated.ends_with('\n') {
                            updated.push('\n');
                        }
                        updated.push_str(&line);
                        updated.push('\n');

                        let serial = next_serial(policy, current_serial(content), now);
                        Ok((Some(bump_serial(&updated, &serial)), serial))
                    })
                    .await
                    .map_err(|e| zone_io_error(&domain, e))?;

                self.ctx.reload.reload(Service::Bind).await?;
                Ok(RecordChange {
                    domain,
                    serial: serial.parse().unwrap_or(0),
                    affected: 1,
                })
            },
        )
        .await
    }

    /// Remove every record whose parsed fields match
    pub async fn delete_record(
        &self,
        domain: &str,
        args: DeleteRecordArgs,
    ) -> PanelResult<RecordChange> {
        audit_operation(
            &self.ctx.audit,
            "delete_record",
            Some(serde_json::json!({
                "domain": domain,
                "name": &args.name,
                "type": &args.record_type,
            })),
            || async {
                let domain = validate_domain(domain)?;
                let record_type = validate_record_type(&args.record_type)?;
                let name = validate_record_name(&args.name)?;

                let now = self.ctx.clock.now();
                let policy = self.ctx.config.dns.serial_policy;
                let value = args.value.as_deref().map(str::trim).filter(|v| !v.is_empty());

                let (removed, serial) = self
                    .ctx
                    .store
                    .edit_text(&self.zone_path(&domain), |content| {
                        let lines: Vec<&str> = content.split('\n').collect();
                        let kept: Vec<&str> = lines
                            .iter()
                            .copied()
                            .filter(|l| {
                                !parse_record_line(l)
                                    .is_some_and(|r| record_matches(&r, &name, &record_type, value))
                            })
                            .collect();

                        let removed = lines.len() - kept.len();
                        if removed == 0 {
                            return Ok((None, (0, String::new())));
                        }

                        let serial = next_serial(policy, current_serial(content), now);
                        let updated = bump_serial(&kept.join("\n"), &serial);
                        Ok((Some(updated), (removed, serial)))
                    })
                    .await
                    .map_err(|e| zone_io_error(&domain, e))?;

                if removed == 0 {
                    return Err(PanelError::not_found(format!(
                        "no {} record named {} in zone {}",
                        record_type, name, domain
                    )));
                }

                self.ctx.reload.reload(Service::Bind).await?;
                Ok(RecordChange {
                    domain,
                    serial: serial.parse().unwrap_or(0),
                    affected: removed,
                })
            },
        )
        .await
    }
}

async fn read_if_present(path: &std::path::Path) -> PanelResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl PanelModule for DnsTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "DnsTools"
    }
}

fn validate_record_type(raw: &str) -> Result<String, ValidationError> {
    let upper = raw.trim().to_ascii_uppercase();
    if ALLOWED_RECORD_TYPES.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(ValidationError::InvalidFormat {
            field: "type".to_string(),
            expected: ALLOWED_RECORD_TYPES.join(", "),
            got: raw.to_string(),
        })
    }
}

/// A missing zone file is a missing zone
fn zone_io_error(domain: &str, err: PanelError) -> PanelError {
    match err {
        PanelError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
            PanelError::not_found(format!("zone {}", domain))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_type() {
        assert_eq!(validate_record_type("aaaa").unwrap(), "AAAA");
        assert_eq!(validate_record_type(" srv ").unwrap(), "SRV");
        assert!(validate_record_type("SOA").is_err());
        assert!(validate_record_type("A;").is_err());
    }

    #[test]
    fn test_zone_io_error_mapping() {
        let missing = PanelError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(zone_io_error("a.com", missing), PanelError::NotFound(_)));
        let denied = PanelError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(zone_io_error("a.com", denied), PanelError::Io(_)));
    }
}
