//! End-to-end export orchestration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use pgscribe_core::{
    DocumentBuilder, Error, ExportDocument, RenderOptions, Result, SchemaObject, TableDdl,
    TableId, TOOL_NAME,
};

use crate::archive::{Packager, ZipPackager};
use crate::artifact::{dump_file_name, ArtifactStage};
use crate::catalog;
use crate::config::ExportConfig;
use crate::data::{RowSource, SnapshotRowSource};
use crate::mail::{Mailer, SmtpMailer};

/// Drives one export run from configuration to packaged artifact.
///
/// The run is strictly sequential and makes a single pass: connect, install
/// the DDL helper, dump sequences, dump tables, remove the helper, assemble
/// the document, stage and pack it, optionally mail it, clean up.
pub struct PostgresExporter {
    config: ExportConfig,
    row_source: Box<dyn RowSource>,
    packager: Box<dyn Packager>,
    mailer: Box<dyn Mailer>,
    database: String,
    generated_sql: String,
    sql_file_name: String,
    archive_file: Option<PathBuf>,
}

impl PostgresExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            row_source: Box::new(SnapshotRowSource),
            packager: Box::new(ZipPackager),
            mailer: Box::new(SmtpMailer),
            database: String::new(),
            generated_sql: String::new(),
            sql_file_name: String::new(),
            archive_file: None,
        }
    }

    /// Replaces the row snapshot strategy.
    pub fn with_row_source(mut self, row_source: Box<dyn RowSource>) -> Self {
        self.row_source = row_source;
        self
    }

    /// Replaces the packaging collaborator.
    pub fn with_packager(mut self, packager: Box<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    /// Replaces the delivery collaborator.
    pub fn with_mailer(mut self, mailer: Box<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Runs the export once.
    ///
    /// Returns `Ok` on full success, on partial success with skipped tables,
    /// and on a clean abort over invalid configuration. Fatal failures such
    /// as an unreachable database or a failed table listing come back as
    /// errors. Inspect the accessors afterwards for what was produced.
    pub async fn export(&mut self) -> Result<()> {
        if let Err(err) = self.config.validate() {
            error!(error = %err, "invalid export configuration, aborting");
            return Ok(());
        }
        let Some(database) = self.config.database_name() else {
            error!("no database name in configuration or connection string, aborting");
            return Ok(());
        };
        if self.config.database.name.is_none() {
            debug!(database = %database, "database name extracted from connection string");
        }
        self.database = database;

        let pool = self.connect().await?;

        let document = self.export_to_sql(&pool).await?;
        self.generated_sql = document.into_string();

        self.sql_file_name = match &self.config.output.sql_file_name {
            Some(base) => format!("{base}.sql"),
            None => dump_file_name(&self.database, Local::now()),
        };

        let stage =
            ArtifactStage::create(self.config.output.temp_dir.as_deref(), &self.sql_file_name)?;
        stage.write_script(&self.generated_sql)?;
        info!(path = %stage.script_path().display(), "dump written");

        self.packager.pack(stage.sql_dir(), stage.archive_path())?;
        self.archive_file = Some(stage.archive_path().to_path_buf());
        info!(path = %stage.archive_path().display(), "archive packed");

        self.deliver(&stage).await;

        stage.cleanup(self.config.output.preserve_archive);
        Ok(())
    }

    async fn connect(&self) -> Result<PgPool> {
        let options = self.config.connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|err| Error::Connection(err.to_string()))?;
        debug!("database connected");
        Ok(pool)
    }

    /// Generates the full document. The DDL helper is removed on every exit
    /// path once its installation succeeded.
    async fn export_to_sql(&self, pool: &PgPool) -> Result<ExportDocument> {
        let timestamp = Local::now().format("%-d-%-m-%Y %-H:%-M:%-S").to_string();
        let mut document =
            DocumentBuilder::with_banner(TOOL_NAME, env!("CARGO_PKG_VERSION"), &timestamp);

        catalog::install_ddl_helper(pool).await?;
        let outcome = self.dump_objects(pool, &mut document).await;
        if let Err(err) = catalog::remove_ddl_helper(pool).await {
            warn!(error = %err, "failed to remove ddl helper function");
        }
        outcome?;

        Ok(document.finish())
    }

    async fn dump_objects(&self, pool: &PgPool, document: &mut DocumentBuilder) -> Result<()> {
        let options = RenderOptions {
            add_if_not_exists: self.config.output.add_if_not_exists,
        };

        match catalog::list_sequences(pool).await {
            Ok(sequences) => {
                info!(sequences = sequences.len(), "dumping sequences");
                for sequence in sequences {
                    if let Err(err) = sequence.validate() {
                        warn!(sequence = %sequence.name, error = %err, "sequence attributes look inconsistent");
                    }
                    document.push_section(&SchemaObject::Sequence(sequence).render_ddl(&options));
                }
            }
            Err(err) => {
                warn!(error = %err, "sequence listing failed, continuing without sequences");
            }
        }

        let tables = catalog::list_tables(pool).await?;
        info!(tables = tables.len(), "dumping tables");
        for table in tables {
            match self.dump_table(pool, &table, &options).await {
                Ok(section) => document.push_section(&section),
                Err(err) => error!(table = %table, error = %err, "table dump failed, skipping"),
            }
        }
        Ok(())
    }

    /// Renders one table's DDL block and data block. Either failure skips the
    /// whole table so no half-rendered section reaches the document.
    async fn dump_table(
        &self,
        pool: &PgPool,
        table: &TableId,
        options: &RenderOptions,
    ) -> Result<String> {
        debug!(table = %table, "dumping table");
        let create_sql = catalog::table_create_sql(pool, table)
            .await?
            .unwrap_or_default();
        let object = SchemaObject::Table(TableDdl::new(table.clone(), create_sql));
        let mut section = object.render_ddl(options);

        let batch = self.row_source.fetch_rows(pool, table).await?;
        section.push_str(&batch.render_block());
        Ok(section)
    }

    /// Sends the archive when a complete email parameter set is configured.
    /// Delivery failures are logged; the artifact is kept either way.
    async fn deliver(&self, stage: &ArtifactStage) {
        let Some(params) = self
            .config
            .email
            .as_ref()
            .and_then(|email| email.delivery_params())
        else {
            if self.config.email.is_some() {
                debug!("email parameters incomplete, skipping delivery");
            }
            return;
        };
        let subject = params.resolved_subject(&self.sql_file_name);
        let body = params.resolved_body(&self.database);
        match self
            .mailer
            .send(&params, &subject, &body, stage.archive_path())
            .await
        {
            Ok(()) => debug!("archive sent as mail attachment"),
            Err(err) => error!(error = %err, "unable to send archive by mail"),
        }
    }

    /// Full text of the generated document, empty until a run assembled one.
    pub fn generated_sql(&self) -> &str {
        &self.generated_sql
    }

    /// Name of the written script file, empty until a run chose one.
    pub fn sql_file_name(&self) -> &str {
        &self.sql_file_name
    }

    /// Location of the packed archive, only while it exists on disk.
    pub fn archive_file(&self) -> Option<&Path> {
        self.archive_file.as_deref().filter(|path| path.exists())
    }
}
