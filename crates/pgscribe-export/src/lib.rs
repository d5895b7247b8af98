//! PostgreSQL export engine: catalog enumeration, dump generation, artifact
//! staging, packaging and delivery.
//!
//! The pure rendering half lives in `pgscribe-core`; this crate owns every
//! side effect of a run, from the database connection to the mailed archive.

pub mod archive;
pub mod artifact;
pub mod catalog;
pub mod config;
pub mod data;
pub mod exporter;
pub mod mail;

pub use archive::{Packager, ZipPackager};
pub use artifact::{dump_file_name, ArtifactStage, DEFAULT_TEMP_DIR};
pub use config::{DatabaseConfig, DeliveryParams, EmailConfig, ExportConfig, OutputConfig};
pub use data::{fetch_row_batch, RowSource, SnapshotRowSource};
pub use exporter::PostgresExporter;
pub use mail::{Mailer, SmtpMailer};

pub use pgscribe_core::{Error, Result};
