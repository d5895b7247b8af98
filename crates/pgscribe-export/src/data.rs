//! Whole-table row snapshots in canonical text form.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use pgscribe_core::{quote_ident, ColumnMeta, Error, Result, RowBatch, TableId};

/// Source of table row sets, pluggable so a streaming strategy can replace
/// the in-memory snapshot without touching literal formatting.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, pool: &PgPool, table: &TableId) -> Result<RowBatch>;
}

/// Default source: one query per table, all rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRowSource;

#[async_trait]
impl RowSource for SnapshotRowSource {
    async fn fetch_rows(&self, pool: &PgPool, table: &TableId) -> Result<RowBatch> {
        fetch_row_batch(pool, table).await
    }
}

fn fetch_err(table: &TableId, message: impl ToString) -> Error {
    Error::RowFetch {
        table: table.qualified(),
        message: message.to_string(),
    }
}

/// Reads column metadata and the full row set for one table.
///
/// Every column is cast to text server-side so values arrive in the server's
/// canonical output form, nulls preserved. Column order follows the catalog's
/// ordinal positions.
pub async fn fetch_row_batch(pool: &PgPool, table: &TableId) -> Result<RowBatch> {
    let column_rows = sqlx::query(
        r#"
        select column_name::text as column_name, data_type::text as data_type
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name)
    .fetch_all(pool)
    .await
    .map_err(|err| fetch_err(table, err))?;

    if column_rows.is_empty() {
        return Err(fetch_err(table, "no columns found in catalog"));
    }

    let mut columns = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        let name: String = row
            .try_get("column_name")
            .map_err(|err| fetch_err(table, err))?;
        let data_type: String = row
            .try_get("data_type")
            .map_err(|err| fetch_err(table, err))?;
        columns.push(ColumnMeta::new(name, data_type));
    }

    let select_list = columns
        .iter()
        .map(|column| format!("{}::text", quote_ident(&column.name)))
        .collect::<Vec<_>>()
        .join(", ");
    let snapshot_sql = format!(
        "select {} from {}.{}",
        select_list,
        quote_ident(&table.schema),
        quote_ident(&table.name)
    );

    let rows = sqlx::query(&snapshot_sql)
        .fetch_all(pool)
        .await
        .map_err(|err| fetch_err(table, err))?;

    let mut batch = RowBatch::new(table.name.clone(), columns);
    for row in &rows {
        let mut values = Vec::with_capacity(batch.columns.len());
        for index in 0..batch.columns.len() {
            let value: Option<String> = row.try_get(index).map_err(|err| fetch_err(table, err))?;
            values.push(value);
        }
        batch.push_row(values);
    }
    Ok(batch)
}
