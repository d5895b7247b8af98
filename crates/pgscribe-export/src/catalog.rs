//! Catalog queries and the transient server-side DDL helper.

use sqlx::{PgPool, Row};

use pgscribe_core::{Result, Sequence, TableId};

/// Server-side routine rendering one `CREATE TABLE` statement per table
/// matching its argument. Column defaults and constraint syntax are formatted
/// by the server itself, which is the only place that renders them reliably.
const DDL_HELPER_SQL: &str = r#"
CREATE OR REPLACE FUNCTION public.generate_create_table_statement(p_table_name character varying)
RETURNS SETOF text AS
$BODY$
DECLARE
    v_table_ddl    text;
    column_record  record;
    table_rec      record;
    constraint_rec record;
BEGIN
    FOR table_rec IN
        SELECT c.relname FROM pg_catalog.pg_class c
            LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE relkind = 'r'
              AND relname ~ ('^(' || p_table_name || ')$')
              AND n.nspname <> 'pg_catalog'
              AND n.nspname <> 'information_schema'
              AND n.nspname !~ '^pg_toast'
              AND pg_catalog.pg_table_is_visible(c.oid)
            ORDER BY c.relname
    LOOP
        FOR column_record IN
            SELECT
                b.nspname AS schema_name,
                b.relname AS table_name,
                a.attname AS column_name,
                pg_catalog.format_type(a.atttypid, a.atttypmod) AS column_type,
                CASE WHEN
                    (SELECT substring(pg_catalog.pg_get_expr(d.adbin, d.adrelid) FOR 128)
                     FROM pg_catalog.pg_attrdef d
                     WHERE d.adrelid = a.attrelid AND d.adnum = a.attnum AND a.atthasdef) IS NOT NULL THEN
                    'DEFAULT ' || (SELECT substring(pg_catalog.pg_get_expr(d.adbin, d.adrelid) FOR 128)
                                   FROM pg_catalog.pg_attrdef d
                                   WHERE d.adrelid = a.attrelid AND d.adnum = a.attnum AND a.atthasdef)
                ELSE
                    ''
                END AS column_default_value,
                CASE WHEN a.attnotnull = true THEN 'NOT NULL' ELSE 'NULL' END AS column_not_null,
                a.attnum AS attnum,
                e.max_attnum AS max_attnum
            FROM
                pg_catalog.pg_attribute a
                INNER JOIN
                (SELECT c.oid, n.nspname, c.relname
                   FROM pg_catalog.pg_class c
                        LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                  WHERE c.relname = table_rec.relname
                    AND pg_catalog.pg_table_is_visible(c.oid)
                  ORDER BY 2, 3) b
                ON a.attrelid = b.oid
                INNER JOIN
                (SELECT a.attrelid, max(a.attnum) AS max_attnum
                   FROM pg_catalog.pg_attribute a
                  WHERE a.attnum > 0
                    AND NOT a.attisdropped
                  GROUP BY a.attrelid) e
                ON a.attrelid = e.attrelid
            WHERE a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
        LOOP
            IF column_record.attnum = 1 THEN
                v_table_ddl := 'CREATE TABLE ' || column_record.schema_name || '.' || column_record.table_name || ' (';
            ELSE
                v_table_ddl := v_table_ddl || ',';
            END IF;

            IF column_record.attnum <= column_record.max_attnum THEN
                v_table_ddl := v_table_ddl || chr(10) ||
                    '    ' || column_record.column_name || ' ' || column_record.column_type || ' ' || column_record.column_default_value || ' ' || column_record.column_not_null;
            END IF;
        END LOOP;

        FOR constraint_rec IN
            SELECT conname, pg_get_constraintdef(c.oid) AS constraintdef
                FROM pg_constraint c
                WHERE conrelid = (
                    SELECT attrelid FROM pg_attribute
                    WHERE attrelid = (
                        SELECT oid FROM pg_class
                        WHERE relname = table_rec.relname
                          AND pg_catalog.pg_table_is_visible(oid)
                    ) AND attname = 'tableoid'
                )
        LOOP
            v_table_ddl := v_table_ddl || ',' || chr(10);
            v_table_ddl := v_table_ddl || 'CONSTRAINT ' || constraint_rec.conname;
            v_table_ddl := v_table_ddl || chr(10) || '    ' || constraint_rec.constraintdef;
        END LOOP;

        v_table_ddl := v_table_ddl || ');';
        RETURN NEXT v_table_ddl;
    END LOOP;
END;
$BODY$ LANGUAGE plpgsql VOLATILE COST 100;
"#;

const DDL_HELPER_DROP_SQL: &str =
    "DROP FUNCTION public.generate_create_table_statement(p_table_name varchar);";

fn schema_err(err: sqlx::Error) -> pgscribe_core::Error {
    pgscribe_core::Error::SchemaQuery(err.to_string())
}

/// Installs the DDL helper. Must run before any table DDL is requested.
pub async fn install_ddl_helper(pool: &PgPool) -> Result<()> {
    sqlx::query(DDL_HELPER_SQL)
        .execute(pool)
        .await
        .map_err(schema_err)?;
    Ok(())
}

/// Drops the DDL helper so no transient routine leaks into the target.
pub async fn remove_ddl_helper(pool: &PgPool) -> Result<()> {
    sqlx::query(DDL_HELPER_DROP_SQL)
        .execute(pool)
        .await
        .map_err(schema_err)?;
    Ok(())
}

/// Lists sequences in non-system schemas with their numeric attributes, in
/// deterministic order.
pub async fn list_sequences(pool: &PgPool) -> Result<Vec<Sequence>> {
    let rows = sqlx::query(
        r#"
        select
          sequence_schema::text as sequence_schema,
          sequence_name::text as sequence_name,
          start_value::bigint as start_value,
          minimum_value::bigint as minimum_value,
          maximum_value::bigint as maximum_value,
          increment::bigint as increment,
          (cycle_option = 'YES') as cycle
        from information_schema.sequences
        where sequence_schema not in ('pg_catalog', 'information_schema')
        order by sequence_schema, sequence_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(schema_err)?;

    rows.into_iter()
        .map(|row| {
            Ok(Sequence {
                schema: row.try_get("sequence_schema").map_err(schema_err)?,
                name: row.try_get("sequence_name").map_err(schema_err)?,
                start_value: row.try_get("start_value").map_err(schema_err)?,
                minimum_value: row.try_get("minimum_value").map_err(schema_err)?,
                maximum_value: row.try_get("maximum_value").map_err(schema_err)?,
                increment: row.try_get("increment").map_err(schema_err)?,
                cycle: row.try_get("cycle").map_err(schema_err)?,
            })
        })
        .collect()
}

/// Lists tables in non-system schemas, in deterministic order.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<TableId>> {
    let rows = sqlx::query(
        r#"
        select schemaname::text as schemaname, tablename::text as tablename
        from pg_catalog.pg_tables
        where schemaname != 'pg_catalog' and schemaname != 'information_schema'
        order by schemaname, tablename
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(schema_err)?;

    rows.into_iter()
        .map(|row| {
            Ok(TableId::new(
                row.try_get::<String, _>("schemaname").map_err(schema_err)?,
                row.try_get::<String, _>("tablename").map_err(schema_err)?,
            ))
        })
        .collect()
}

/// Invokes the installed helper for one table and returns its first produced
/// row, or `None` when the table vanished between listing and rendering.
pub async fn table_create_sql(pool: &PgPool, table: &TableId) -> Result<Option<String>> {
    let rows: Vec<Option<String>> = sqlx::query_scalar(
        "select statement from public.generate_create_table_statement($1) as t(statement)",
    )
    .bind(&table.name)
    .fetch_all(pool)
    .await
    .map_err(|err| pgscribe_core::Error::Render {
        object: table.qualified(),
        message: err.to_string(),
    })?;

    Ok(rows.into_iter().flatten().next())
}
