//! Integration tests against a live PostgreSQL instance.
//!
//! Set `TEST_DATABASE_URL` (or `DATABASE_URL`) with embedded credentials to a
//! database that may hold throwaway objects. Without it the tests skip.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use pgscribe_core::{ColumnMeta, RowBatch, TableId};
use pgscribe_export::{
    DatabaseConfig, DeliveryParams, EmailConfig, ExportConfig, Mailer, OutputConfig,
    PostgresExporter, RowSource,
};

// Live tests take this guard first: concurrent exports against one database
// contend on the shared server-side helper routine.
static DB_GUARD: Mutex<()> = Mutex::new(());

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .ok()
        .or_else(|| env::var("DATABASE_URL").ok())
}

fn url_credentials(url: &str) -> Option<(String, String)> {
    let (_, rest) = url.split_once("://")?;
    let (userinfo, _) = rest.rsplit_once('@')?;
    let (username, password) = userinfo.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn scratch_dir(tag: &str) -> PathBuf {
    env::temp_dir().join(format!("pgscribe-{tag}-{}", process::id()))
}

fn live_config(url: &str, scratch: &Path, file_base: &str) -> Option<ExportConfig> {
    let (username, password) = url_credentials(url)?;
    Some(ExportConfig {
        database: DatabaseConfig {
            username: Some(username),
            password: Some(password),
            connection_string: Some(url.to_string()),
            ..Default::default()
        },
        output: OutputConfig {
            sql_file_name: Some(file_base.to_string()),
            temp_dir: Some(scratch.to_path_buf()),
            add_if_not_exists: true,
            preserve_archive: true,
        },
        email: None,
    })
}

fn complete_email() -> EmailConfig {
    EmailConfig {
        host: Some("smtp.example.com".to_string()),
        port: Some(587),
        username: Some("backup@example.com".to_string()),
        password: Some("secret".to_string()),
        from: Some("backup@example.com".to_string()),
        to: Some("ops@example.com".to_string()),
        subject: None,
        message: None,
    }
}

async fn create_fixtures(pool: &PgPool) -> Result<()> {
    drop_fixtures(pool).await?;
    sqlx::query(
        "create table pgscribe_people (id integer primary key, name text, active boolean)",
    )
    .execute(pool)
    .await
    .context("create people table")?;
    sqlx::query(
        "insert into pgscribe_people (id, name, active) values \
         (1, 'ada', true), (2, 'O''Brien', false), (3, null, null)",
    )
    .execute(pool)
    .await
    .context("insert people rows")?;
    sqlx::query("create table pgscribe_empty (id integer)")
        .execute(pool)
        .await
        .context("create empty table")?;
    sqlx::query("create table pgscribe_void ()")
        .execute(pool)
        .await
        .context("create zero-column table")?;
    sqlx::query("create sequence pgscribe_seq start with 5 increment by 1")
        .execute(pool)
        .await
        .context("create sequence")?;
    Ok(())
}

async fn drop_fixtures(pool: &PgPool) -> Result<()> {
    for statement in [
        "drop table if exists pgscribe_people cascade",
        "drop table if exists pgscribe_empty cascade",
        "drop table if exists pgscribe_void cascade",
        "drop sequence if exists pgscribe_seq",
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("fixture teardown: {statement}"))?;
    }
    Ok(())
}

/// Captures what the exporter hands to its delivery collaborator.
#[derive(Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<(String, String, PathBuf)>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        _params: &DeliveryParams,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> pgscribe_export::Result<()> {
        self.sent.lock().expect("mailer log").push((
            subject.to_string(),
            body.to_string(),
            attachment.to_path_buf(),
        ));
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _params: &DeliveryParams,
        _subject: &str,
        _body: &str,
        _attachment: &Path,
    ) -> pgscribe_export::Result<()> {
        Err(pgscribe_export::Error::Delivery(
            "relay unreachable".to_string(),
        ))
    }
}

/// Serves one fixed row for every table it is asked about.
struct CannedRowSource;

#[async_trait]
impl RowSource for CannedRowSource {
    async fn fetch_rows(
        &self,
        _pool: &PgPool,
        table: &TableId,
    ) -> pgscribe_export::Result<RowBatch> {
        let mut batch = RowBatch::new(table.name.clone(), vec![ColumnMeta::new("id", "integer")]);
        batch.push_row(vec![Some("42".to_string())]);
        Ok(batch)
    }
}

#[tokio::test]
async fn exports_live_database_to_archive() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping export integration test: TEST_DATABASE_URL not set");
        return Ok(());
    };
    let scratch = scratch_dir("it");
    let _ = fs::remove_dir_all(&scratch);
    let Some(config) = live_config(&url, &scratch, "pgscribe_it") else {
        eprintln!("skipping export integration test: no credentials embedded in database url");
        return Ok(());
    };
    let _guard = DB_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .context("connect for fixture setup")?;
    create_fixtures(&pool).await?;

    let mut exporter = PostgresExporter::new(config);
    exporter.export().await.context("export run")?;

    let sql = exporter.generated_sql().to_string();
    assert!(
        sql.starts_with("--\n-- Generated by pgscribe "),
        "banner missing: {}",
        &sql[..sql.len().min(120)]
    );

    // Sequence section with guard and full attribute set.
    assert!(sql.contains("-- start  sequence dump : pgscribe_seq"));
    assert!(sql.contains(
        "CREATE SEQUENCE IF NOT EXISTS public.pgscribe_seq INCREMENT BY 1 MINVALUE 1 \
         MAXVALUE 9223372036854775807 START WITH 5 NO CYCLE;"
    ));

    // Table DDL rendered by the server-side helper, rewritten idempotent.
    assert!(sql.contains("-- start  table dump : pgscribe_people"));
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.pgscribe_people ("));
    assert!(sql.contains("-- end  table dump : pgscribe_people"));

    // Data section with quoting, escaping, nulls and boolean keywords.
    assert!(sql.contains("-- start table insert : pgscribe_people"));
    assert!(sql.contains("INSERT INTO \"pgscribe_people\" (\"id\", \"name\", \"active\") VALUES \n"));
    assert!(sql.contains("(1, 'ada', true)"));
    assert!(sql.contains(r"(2, 'O\'Brien', false)"));
    assert!(sql.contains("(3, NULL, NULL);"));

    // Empty table keeps its DDL section but gets no insert block.
    assert!(sql.contains("-- start  table dump : pgscribe_empty"));
    assert!(!sql.contains("table insert : pgscribe_empty"));

    // The zero-column table cannot be snapshotted and is skipped whole.
    assert!(!sql.contains("table dump : pgscribe_void"));

    // The helper routine does not outlive the run.
    let helpers: i64 = sqlx::query_scalar(
        "select count(*) from pg_proc where proname = 'generate_create_table_statement'",
    )
    .fetch_one(&pool)
    .await
    .context("count helper functions")?;
    assert_eq!(helpers, 0);

    // Artifact layout after a preserving cleanup.
    assert_eq!(exporter.sql_file_name(), "pgscribe_it.sql");
    let archive = exporter.archive_file().context("archive kept on disk")?;
    assert_eq!(archive, scratch.join("pgscribe_it.zip"));
    assert!(!scratch.join("sql").exists());

    drop_fixtures(&pool).await?;
    fs::remove_dir_all(&scratch).context("scratch removed")?;
    Ok(())
}

#[tokio::test]
async fn injected_row_source_feeds_the_data_section() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping export integration test: TEST_DATABASE_URL not set");
        return Ok(());
    };
    let scratch = scratch_dir("canned");
    let _ = fs::remove_dir_all(&scratch);
    let Some(config) = live_config(&url, &scratch, "pgscribe_canned") else {
        eprintln!("skipping export integration test: no credentials embedded in database url");
        return Ok(());
    };
    let _guard = DB_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .context("connect for fixture setup")?;
    create_fixtures(&pool).await?;

    let mut exporter = PostgresExporter::new(config).with_row_source(Box::new(CannedRowSource));
    exporter.export().await.context("export run")?;

    // The snapshot never ran; every table carries the canned batch instead.
    let sql = exporter.generated_sql();
    assert!(sql.contains("INSERT INTO \"pgscribe_people\" (\"id\") VALUES \n(42);"));
    assert!(!sql.contains("'ada'"));

    drop_fixtures(&pool).await?;
    fs::remove_dir_all(&scratch).context("scratch removed")?;
    Ok(())
}

#[tokio::test]
async fn delivery_gets_default_subject_body_and_archive() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping export integration test: TEST_DATABASE_URL not set");
        return Ok(());
    };
    let scratch = scratch_dir("mail");
    let _ = fs::remove_dir_all(&scratch);
    let Some(mut config) = live_config(&url, &scratch, "pgscribe_mail") else {
        eprintln!("skipping export integration test: no credentials embedded in database url");
        return Ok(());
    };
    config.email = Some(complete_email());
    let database = config.database_name().context("database name from url")?;
    let _guard = DB_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let mailer = RecordingMailer::default();
    let sent = Arc::clone(&mailer.sent);
    let mut exporter = PostgresExporter::new(config).with_mailer(Box::new(mailer));
    exporter.export().await.context("export run")?;

    let sent = sent.lock().expect("mailer log");
    assert_eq!(sent.len(), 1);
    let (subject, body, attachment) = sent.first().context("one delivery recorded")?;
    assert_eq!(subject, "PGSCRIBE_MAIL");
    assert_eq!(
        body,
        &format!("Please find attached database backup of {database}")
    );
    assert_eq!(attachment, &scratch.join("pgscribe_mail.zip"));
    assert!(exporter.archive_file().is_some());

    fs::remove_dir_all(&scratch).context("scratch removed")?;
    Ok(())
}

#[tokio::test]
async fn failed_delivery_is_not_fatal_and_keeps_archive() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping export integration test: TEST_DATABASE_URL not set");
        return Ok(());
    };
    let scratch = scratch_dir("mailfail");
    let _ = fs::remove_dir_all(&scratch);
    let Some(mut config) = live_config(&url, &scratch, "pgscribe_mailfail") else {
        eprintln!("skipping export integration test: no credentials embedded in database url");
        return Ok(());
    };
    config.email = Some(complete_email());
    let _guard = DB_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut exporter = PostgresExporter::new(config).with_mailer(Box::new(FailingMailer));
    exporter
        .export()
        .await
        .context("delivery failure must not fail the run")?;

    let archive = exporter.archive_file().context("archive kept on disk")?;
    assert_eq!(archive, scratch.join("pgscribe_mailfail.zip"));
    assert!(archive.is_file());

    fs::remove_dir_all(&scratch).context("scratch removed")?;
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_aborts_cleanly() -> Result<()> {
    let config = ExportConfig {
        database: DatabaseConfig {
            username: Some("app".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut exporter = PostgresExporter::new(config);
    exporter.export().await.context("aborted run still returns ok")?;

    assert!(exporter.generated_sql().is_empty());
    assert!(exporter.sql_file_name().is_empty());
    assert!(exporter.archive_file().is_none());
    Ok(())
}
