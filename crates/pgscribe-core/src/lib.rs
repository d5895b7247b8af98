//! Core rendering logic for pgscribe.
//!
//! This crate holds the pure half of the exporter: schema object types, DDL
//! and INSERT rendering, idempotency rewriting, and dump document assembly.
//! Everything here is plain text in, plain text out; catalog access and
//! artifact handling live in `pgscribe-export`.

pub mod document;
pub mod error;
pub mod ident;
pub mod insert;
pub mod object;
pub mod render;

pub use document::{DocumentBuilder, ExportDocument};
pub use error::{Error, Result};
pub use ident::quote_ident;
pub use insert::{classify, format_literal, ColumnMeta, LiteralClass, RowBatch};
pub use object::{SchemaObject, Sequence, TableDdl, TableId};
pub use render::{add_if_not_exists, ddl_block, RenderOptions, SQL_END_PATTERN, SQL_START_PATTERN};

/// Name stamped into the generated document banner.
pub const TOOL_NAME: &str = "pgscribe";
