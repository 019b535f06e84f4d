/// Schema management through a recorded `mysql` client.
mod common;

use common::Sandbox;
use vpsctl::common::error::PanelError;
use vpsctl::databases::{CreateDatabaseArgs, DatabaseTools};

fn schema(name: &str) -> CreateDatabaseArgs {
    CreateDatabaseArgs {
        name: name.to_string(),
        db_user: None,
        password: None,
        host: None,
    }
}

fn stdin_of(call: &common::Call) -> String {
    String::from_utf8_lossy(call.stdin.as_deref().unwrap_or_default()).into_owned()
}

#[tokio::test]
async fn test_list_skips_system_schemas() {
    let sb = Sandbox::new();
    sb.executor.respond(
        "mysql",
        "information_schema\t0.2\t79\nmysql\t2.5\t31\nperformance_schema\t0.0\t87\nshop\t12.5\t8\nblog\t0.4\t12\n",
    );

    let dbs = DatabaseTools::new(sb.ctx.clone()).list().await.unwrap();
    let names: Vec<&str> = dbs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["shop", "blog"]);
    assert_eq!(dbs[1].size, "0.4 MB");

    let call = &sb.executor.calls_to("mysql")[0];
    assert_eq!(call.args, vec!["-u", "root", "--batch", "--skip-column-names"]);
    assert!(stdin_of(call).contains("information_schema.schemata"));
}

#[tokio::test]
async fn test_create_with_grant_keeps_password_off_argv() {
    let sb = Sandbox::new();
    let dbs = DatabaseTools::new(sb.ctx.clone());

    let created = dbs
        .create(CreateDatabaseArgs {
            db_user: Some("shop_app".to_string()),
            password: Some("pa'ss-w0rd!".to_string()),
            ..schema("shop")
        })
        .await
        .unwrap();
    assert_eq!(created.database, "shop");
    assert_eq!(created.user.as_deref(), Some("shop_app"));

    let calls = sb.executor.calls_to("mysql");
    assert_eq!(calls.len(), 2);
    assert!(stdin_of(&calls[0]).starts_with("CREATE DATABASE `shop`"));
    let grant = stdin_of(&calls[1]);
    assert!(grant.contains("CREATE USER 'shop_app'@'localhost' IDENTIFIED BY 'pa\\'ss-w0rd!';"));
    assert!(calls
        .iter()
        .all(|c| !c.args.iter().any(|a| a.contains("pa'ss"))));
}

#[tokio::test]
async fn test_failed_grant_drops_new_schema() {
    let sb = Sandbox::new();
    sb.executor
        .fail_matching("CREATE USER", "ERROR 1396 (HY000): Operation CREATE USER failed");
    let dbs = DatabaseTools::new(sb.ctx.clone());

    let result = dbs
        .create(CreateDatabaseArgs {
            db_user: Some("shop_app".to_string()),
            password: Some("s3cret-passw0rd".to_string()),
            ..schema("shop")
        })
        .await;
    assert!(matches!(result, Err(PanelError::ExecutionFailed { .. })));

    let calls = sb.executor.calls_to("mysql");
    assert_eq!(calls.len(), 3);
    assert_eq!(stdin_of(&calls[2]), "DROP DATABASE `shop`;\n");
}

#[tokio::test]
async fn test_half_specified_grant_is_rejected() {
    let sb = Sandbox::new();
    let dbs = DatabaseTools::new(sb.ctx.clone());

    let no_password = dbs
        .create(CreateDatabaseArgs {
            db_user: Some("shop_app".to_string()),
            ..schema("shop")
        })
        .await;
    assert!(matches!(no_password, Err(PanelError::Validation(_))));
    assert!(matches!(
        dbs.create(schema("mysql")).await,
        Err(PanelError::Forbidden(_))
    ));
    assert!(sb.executor.calls().is_empty());
}

#[tokio::test]
async fn test_drop_requires_existing_schema() {
    let sb = Sandbox::new();
    sb.executor.respond("mysql", "0");
    let dbs = DatabaseTools::new(sb.ctx.clone());

    assert!(matches!(
        dbs.drop_database("ghost").await,
        Err(PanelError::NotFound(_))
    ));
    assert!(matches!(
        dbs.drop_database("information_schema").await,
        Err(PanelError::Forbidden(_))
    ));
    assert_eq!(sb.executor.calls_to("mysql").len(), 1);
}

#[tokio::test]
async fn test_drop_existing_schema() {
    let sb = Sandbox::new();
    sb.executor.respond("mysql", "1");
    let dbs = DatabaseTools::new(sb.ctx.clone());

    dbs.drop_database("shop").await.unwrap();
    let calls = sb.executor.calls_to("mysql");
    assert_eq!(calls.len(), 2);
    assert!(stdin_of(&calls[0]).contains("schema_name = 'shop'"));
    assert_eq!(stdin_of(&calls[1]), "DROP DATABASE `shop`;\n");
}

#[tokio::test]
async fn test_configured_client_password() {
    let sb = Sandbox::with_config(|c| c.mysql.password = "dbroot".to_string());
    sb.executor.respond("mysql", "");
    DatabaseTools::new(sb.ctx.clone()).list().await.unwrap();

    let call = &sb.executor.calls_to("mysql")[0];
    assert_eq!(
        call.args,
        vec!["-u", "root", "-pdbroot", "--batch", "--skip-column-names"]
    );
}
