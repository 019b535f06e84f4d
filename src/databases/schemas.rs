use crate::common::compensation::Compensation;
use crate::common::context::PanelContext;
use crate::common::error::{PanelError, PanelResult};
use crate::common::panel_module::PanelModule;
use crate::common::security::helpers::audit_operation;
use crate::common::security::{validate_password, ValidationError};
use std::sync::Arc;

use super::sql::{
    account_host, create_database_sql, database_name, database_user, drop_database_sql,
    grant_sql, is_system_schema, list_databases_sql, parse_database_rows, schema_exists_sql,
    show_tables_sql,
};
use super::types::{CreateDatabaseArgs, Database, DatabaseCreated, TableList};

/// Schemas and grants through the `mysql` client.
///
/// Statements travel on stdin so that neither SQL nor user passwords appear
/// in the process list.
pub struct DatabaseTools {
    ctx: PanelContext,
}

impl DatabaseTools {
    pub fn new(ctx: PanelContext) -> Self {
        Self { ctx }
    }

    /// Client arguments: `-u <user> [-p<password>] --batch --skip-column-names`
    fn client_args(&self) -> Vec<String> {
        let mysql = &self.ctx.config.mysql;
        let mut args = vec!["-u".to_string(), mysql.user.clone()];
        if !mysql.password.is_empty() {
            args.push(format!("-p{}", mysql.password));
        }
        args.push("--batch".to_string());
        args.push("--skip-column-names".to_string());
        args
    }

    async fn execute(&self, sql: &str) -> PanelResult<String> {
        let args = self.client_args();
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.ctx
            .gate
            .run_with_stdin("mysql", &argv, sql.as_bytes())
            .await
    }

    pub async fn list(&self) -> PanelResult<Vec<Database>> {
        audit_operation(&self.ctx.audit, "list_databases", None, || async {
            let out = self.execute(list_databases_sql()).await?;
            Ok(parse_database_rows(&out))
        })
        .await
    }

    /// Create a schema and, optionally, an account with all privileges on it
    pub async fn create(&self, args: CreateDatabaseArgs) -> PanelResult<DatabaseCreated> {
        audit_operation(
            &self.ctx.audit,
            "create_database",
            Some(serde_json::json!({
                "name": &args.name,
                "db_user": &args.db_user,
                "host": &args.host,
            })),
            || async {
                let name = database_name(&args.name)?;
                if is_system_schema(&name) {
                    return Err(PanelError::forbidden(format!("{} is a system database", name)));
                }
                let user = args.db_user.as_deref().map(str::trim).filter(|u| !u.is_empty());
                let password = args.password.as_deref().filter(|p| !p.is_empty());
                let grant = match (user, password) {
                    (Some(u), Some(p)) => {
                        validate_password(p)?;
                        let user = database_user(u)?;
                        let host = account_host(args.host.as_deref())?;
                        Some((user.clone(), grant_sql(&name, &user, &host, p)))
                    }
                    (None, None) => None,
                    (Some(_), None) => {
                        return Err(ValidationError::Empty {
                            field: "password".to_string(),
                        }
                        .into())
                    }
                    (None, Some(_)) => {
                        return Err(ValidationError::Empty {
                            field: "db_user".to_string(),
                        }
                        .into())
                    }
                };

                let mut tx = Compensation::new("create_database", Arc::clone(&self.ctx.audit));
                tx.run("database", self.execute(&create_database_sql(&name)))
                    .await?;

                let Some((user, sql)) = grant else {
                    return Ok(DatabaseCreated {
                        database: name,
                        user: None,
                    });
                };

                let gate = Arc::clone(&self.ctx.gate);
                let client = self.client_args();
                let drop = drop_database_sql(&name);
                tx.undo_with("database", move || async move {
                    let argv: Vec<&str> = client.iter().map(String::as_str).collect();
                    gate.run_with_stdin("mysql", &argv, drop.as_bytes())
                        .await
                        .map(|_| ())
                });
                tx.run("grant", self.execute(&sql)).await?;

                Ok(DatabaseCreated {
                    database: name,
                    user: Some(user),
                })
            },
        )
        .await
    }

    pub async fn drop_database(&self, name: &str) -> PanelResult<()> {
        audit_operation(
            &self.ctx.audit,
            "drop_database",
            Some(serde_json::json!({"name": name})),
            || async {
                let name = database_name(name)?;
                if is_system_schema(&name) {
                    return Err(PanelError::forbidden(format!(
                        "cannot drop system database {}",
                        name
                    )));
                }
                self.require_schema(&name).await?;

                self.ctx.audit.log_dangerous_operation(
                    "drop_database",
                    true,
                    &format!("Dropping database {}", name),
                );
                self.execute(&drop_database_sql(&name)).await.map(|_| ())
            },
        )
        .await
    }

    pub async fn list_tables(&self, name: &str) -> PanelResult<TableList> {
        audit_operation(
            &self.ctx.audit,
            "list_tables",
            Some(serde_json::json!({"name": name})),
            || async {
                let name = database_name(name)?;
                self.require_schema(&name).await?;
                let out = self.execute(&show_tables_sql(&name)).await?;
                Ok(TableList {
                    tables: out
                        .lines()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect(),
                    database: name,
                })
            },
        )
        .await
    }

    async fn require_schema(&self, name: &str) -> PanelResult<()> {
        let out = self.execute(&schema_exists_sql(name)).await?;
        match out.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(PanelError::not_found(format!("database {}", name))),
        }
    }
}

impl PanelModule for DatabaseTools {
    fn context(&self) -> &PanelContext {
        &self.ctx
    }

    fn name(&self) -> &'static str {
        "DatabaseTools"
    }
}
