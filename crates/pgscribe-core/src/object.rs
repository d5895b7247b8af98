//! Schema objects captured from the database catalog.

use std::fmt;

use crate::error::{Error, Result};
use crate::render::{self, RenderOptions};

/// A sequence with the structured attributes needed to recreate it.
///
/// Attributes the catalog left unspecified stay `None` and are omitted from
/// the rendered statement so the server fills in its own defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub start_value: Option<i64>,
    pub minimum_value: Option<i64>,
    pub maximum_value: Option<i64>,
    pub increment: Option<i64>,
    pub cycle: bool,
}

impl Sequence {
    /// Checks the attribute combination against what the server would accept.
    ///
    /// Unspecified attributes never fail validation; only contradictions
    /// between present values do.
    pub fn validate(&self) -> Result<()> {
        if self.increment == Some(0) {
            return Err(Error::InvalidObject(format!(
                "sequence {}: increment must be non-zero",
                self.name
            )));
        }
        if let (Some(minimum), Some(maximum)) = (self.minimum_value, self.maximum_value) {
            if minimum > maximum {
                return Err(Error::InvalidObject(format!(
                    "sequence {}: minvalue {} exceeds maxvalue {}",
                    self.name, minimum, maximum
                )));
            }
        }
        if let (Some(minimum), Some(start)) = (self.minimum_value, self.start_value) {
            if start < minimum {
                return Err(Error::InvalidObject(format!(
                    "sequence {}: start {} below minvalue {}",
                    self.name, start, minimum
                )));
            }
        }
        if let (Some(maximum), Some(start)) = (self.maximum_value, self.start_value) {
            if start > maximum {
                return Err(Error::InvalidObject(format!(
                    "sequence {}: start {} above maxvalue {}",
                    self.name, start, maximum
                )));
            }
        }
        Ok(())
    }

    /// Renders the single `CREATE SEQUENCE` statement for this sequence.
    pub fn create_sql(&self) -> String {
        let mut sql = format!("CREATE SEQUENCE {}.{}", self.schema, self.name);
        if let Some(increment) = self.increment {
            sql.push_str(&format!(" INCREMENT BY {increment}"));
        }
        if let Some(minimum) = self.minimum_value {
            sql.push_str(&format!(" MINVALUE {minimum}"));
        }
        if let Some(maximum) = self.maximum_value {
            sql.push_str(&format!(" MAXVALUE {maximum}"));
        }
        if let Some(start) = self.start_value {
            sql.push_str(&format!(" START WITH {start}"));
        }
        sql.push_str(if self.cycle { " CYCLE;" } else { " NO CYCLE;" });
        sql
    }
}

/// Schema-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub schema: String,
    pub name: String,
}

impl TableId {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name` without quoting, for display and logs.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A table plus the `CREATE TABLE` text obtained from the server-side helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub table: TableId,
    pub create_sql: String,
}

impl TableDdl {
    pub fn new(table: TableId, create_sql: impl Into<String>) -> Self {
        Self {
            table,
            create_sql: create_sql.into(),
        }
    }
}

/// Anything the dump emits a DDL section for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaObject {
    Sequence(Sequence),
    Table(TableDdl),
}

impl SchemaObject {
    /// Bare object name as it appears in section markers.
    pub fn name(&self) -> &str {
        match self {
            SchemaObject::Sequence(sequence) => &sequence.name,
            SchemaObject::Table(table) => &table.table.name,
        }
    }

    /// Renders the object's DDL wrapped in its section markers.
    pub fn render_ddl(&self, options: &RenderOptions) -> String {
        match self {
            SchemaObject::Sequence(sequence) => {
                let mut sql = sequence.create_sql();
                if options.add_if_not_exists {
                    sql = render::add_if_not_exists(&sql);
                }
                render::ddl_block("sequence dump", &sequence.name, &sql)
            }
            SchemaObject::Table(table) => {
                let mut sql = table.create_sql.clone();
                if options.add_if_not_exists {
                    sql = render::add_if_not_exists(&sql);
                }
                render::ddl_block("table dump", &table.table.name, &sql)
            }
        }
    }
}
