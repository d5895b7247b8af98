//! Batched INSERT rendering with type-aware literal formatting.

use crate::ident::quote_ident;
use crate::render::{SQL_END_PATTERN, SQL_START_PATTERN};

/// How a column's values are written into SQL literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralClass {
    /// 16- and 32-bit integers, emitted bare.
    Integer,
    /// 64-bit integers, emitted bare.
    BigInt,
    /// Booleans, emitted as the keywords `true` / `false`.
    Boolean,
    /// Everything else, single-quoted with escaping.
    Quoted,
}

/// Maps a declared column type to its literal class.
///
/// Types not listed fall through to [`LiteralClass::Quoted`]: values arrive in
/// the server's canonical text form, so quoting them is always replayable.
/// That covers numerics, date/time types, json, arrays, bit strings and every
/// user-defined type.
pub fn classify(data_type: &str) -> LiteralClass {
    match data_type.trim().to_ascii_lowercase().as_str() {
        "smallint" | "int2" | "integer" | "int4" => LiteralClass::Integer,
        "bigint" | "int8" => LiteralClass::BigInt,
        "boolean" | "bool" => LiteralClass::Boolean,
        _ => LiteralClass::Quoted,
    }
}

/// Formats one value as a SQL literal. An absent value renders as `NULL`
/// regardless of class.
pub fn format_literal(class: LiteralClass, value: Option<&str>) -> String {
    let Some(value) = value else {
        return "NULL".to_string();
    };
    match class {
        LiteralClass::Integer | LiteralClass::BigInt => value.to_string(),
        LiteralClass::Boolean => {
            let keyword = if matches!(value, "t" | "true") {
                "true"
            } else {
                "false"
            };
            keyword.to_string()
        }
        LiteralClass::Quoted => format!("'{}'", value.replace('\'', "\\'")),
    }
}

/// Column metadata captured once per table before serialization starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn literal_class(&self) -> LiteralClass {
        classify(&self.data_type)
    }
}

/// The full materialized row set of one table in canonical text form.
///
/// Created, rendered and discarded within a single table's dump step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBatch {
    pub table: String,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowBatch {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnMeta>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the batched `INSERT` statement, one parenthesized tuple per
    /// row, or an empty string when the table holds no rows.
    pub fn render_insert(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let columns = self
            .columns
            .iter()
            .map(|column| quote_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES \n",
            quote_ident(&self.table),
            columns
        );
        let tuples = self
            .rows
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .zip(&self.columns)
                    .map(|(value, column)| format_literal(column.literal_class(), value.as_deref()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            })
            .collect::<Vec<_>>()
            .join(",\n");
        sql.push_str(&tuples);
        sql.push(';');
        sql
    }

    /// Renders the statement wrapped in its section markers, or an empty
    /// string when there is nothing to insert.
    pub fn render_block(&self) -> String {
        let statement = self.render_insert();
        if statement.is_empty() {
            return String::new();
        }
        let table = &self.table;
        let mut block = format!("\n--\n-- Inserts of {table}\n--\n\n");
        block.push_str(&format!(
            "\n--\n{SQL_START_PATTERN} table insert : {table}\n--\n"
        ));
        block.push_str(&statement);
        block.push_str(&format!(
            "\n--\n{SQL_END_PATTERN} table insert : {table}\n--\n"
        ));
        block
    }
}
