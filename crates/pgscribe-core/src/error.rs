use thiserror::Error;

/// Core error type shared across pgscribe crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or contradictory export configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The target database could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),
    /// A catalog query failed outside the scope of a single table.
    #[error("schema query failed: {0}")]
    SchemaQuery(String),
    /// DDL could not be produced for one schema object.
    #[error("ddl rendering failed for {object}: {message}")]
    Render { object: String, message: String },
    /// Row data could not be read for one table.
    #[error("row fetch failed for {table}: {message}")]
    RowFetch { table: String, message: String },
    /// A schema object carries attributes the server would reject.
    #[error("invalid schema object: {0}")]
    InvalidObject(String),
    /// Filesystem failure while staging artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The archive could not be produced.
    #[error("pack error: {0}")]
    Pack(String),
    /// The archive could not be sent by mail.
    #[error("mail delivery error: {0}")]
    Delivery(String),
}

/// Convenience alias for results returned by pgscribe crates.
pub type Result<T> = std::result::Result<T, Error>;
