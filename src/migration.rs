//! Materialize declarations in the database: schemas, tables, indexes, then foreign keys.
//! Foreign keys come last so reference cycles between tables need no ordering.
//! Every statement is guarded, so applying the same declarations twice is a no-op.

use crate::config::{default_schema_id, validate, FullConfig, TableConfig};
use crate::error::{AppError, ConfigError};
use crate::sql::{qualified_table, quote_ident, quote_literal};
use sqlx::PgPool;
use std::collections::HashMap;

/// One DDL statement. Comments are applied best-effort after the schema itself.
#[derive(Clone, Debug, PartialEq)]
pub enum DdlStatement {
    Schema(String),
    Comment(String),
}

impl DdlStatement {
    pub fn sql(&self) -> &str {
        match self {
            DdlStatement::Schema(s) | DdlStatement::Comment(s) => s,
        }
    }
}

/// Ordered DDL for the declarations. Validates first.
pub fn ddl_statements(config: &FullConfig) -> Result<Vec<DdlStatement>, ConfigError> {
    validate(config)?;
    let default_sid = default_schema_id(config)?;
    let schemas_by_id: HashMap<_, _> = config.schemas.iter().map(|s| (s.id.as_str(), s)).collect();
    let table_name = |t: &TableConfig| -> Result<(String, String), ConfigError> {
        let sid = t.schema_id.as_deref().unwrap_or(default_sid);
        let schema = schemas_by_id.get(sid).ok_or_else(|| ConfigError::MissingReference {
            kind: "schema",
            id: sid.to_string(),
        })?;
        Ok((schema.name.clone(), t.name.clone()))
    };

    let mut out = Vec::new();

    for s in &config.schemas {
        out.push(DdlStatement::Schema(format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(&s.name)
        )));
        if let Some(c) = &s.comment {
            out.push(DdlStatement::Comment(format!(
                "COMMENT ON SCHEMA {} IS {}",
                quote_ident(&s.name),
                quote_literal(c)
            )));
        }
    }

    for t in &config.tables {
        let (schema, name) = table_name(t)?;
        let full_name = qualified_table(&schema, &name);

        let mut col_defs: Vec<String> = Vec::new();
        let mut comments: Vec<DdlStatement> = Vec::new();
        if let Some(c) = &t.comment {
            comments.push(DdlStatement::Comment(format!(
                "COMMENT ON TABLE {} IS {}",
                full_name,
                quote_literal(c)
            )));
        }
        for c in config.columns_of(&t.id) {
            let mut def = format!("{} {}", quote_ident(&c.name), c.type_.to_sql());
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            col_defs.push(def);
            if let Some(comment) = &c.comment {
                comments.push(DdlStatement::Comment(format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    full_name,
                    quote_ident(&c.name),
                    quote_literal(comment)
                )));
            }
        }

        let pk_cols: Vec<String> = t.primary_key.columns().into_iter().map(quote_ident).collect();
        col_defs.push(format!("PRIMARY KEY ({})", pk_cols.join(", ")));

        for u in &t.unique {
            let cols: Vec<String> = u.iter().map(|s| quote_ident(s)).collect();
            col_defs.push(format!("UNIQUE ({})", cols.join(", ")));
        }
        for ch in &t.check {
            col_defs.push(format!(
                "CONSTRAINT {} CHECK ({})",
                quote_ident(&ch.name),
                ch.expression
            ));
        }

        out.push(DdlStatement::Schema(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            full_name,
            col_defs.join(",\n  ")
        )));
        out.extend(comments);
    }

    for idx in &config.indexes {
        let (schema, name) = table_name(lookup_table(config, &idx.table_id)?)?;
        let cols: Vec<String> = idx.columns.iter().map(|c| quote_ident(c)).collect();
        let unique = if idx.unique { "UNIQUE " } else { "" };
        out.push(DdlStatement::Schema(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            unique,
            quote_ident(&idx.name),
            qualified_table(&schema, &name),
            cols.join(", ")
        )));
    }

    for rel in &config.relationships {
        let missing = |id: &str| ConfigError::MissingReference {
            kind: "column",
            id: id.to_string(),
        };
        let from_col = config.column(&rel.from_column_id).ok_or_else(|| missing(&rel.from_column_id))?;
        let to_col = config.column(&rel.to_column_id).ok_or_else(|| missing(&rel.to_column_id))?;
        let (from_schema, from_table) = table_name(lookup_table(config, &from_col.table_id)?)?;
        let (to_schema, to_table) = table_name(lookup_table(config, &to_col.table_id)?)?;
        let constraint = rel.constraint_name();

        let alter = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            qualified_table(&from_schema, &from_table),
            quote_ident(constraint),
            quote_ident(&from_col.name),
            qualified_table(&to_schema, &to_table),
            quote_ident(&to_col.name),
            rel.on_update.as_deref().unwrap_or("NO ACTION"),
            rel.on_delete.as_deref().unwrap_or("NO ACTION")
        );
        // PostgreSQL has no ADD CONSTRAINT IF NOT EXISTS.
        out.push(DdlStatement::Schema(format!(
            "DO $$\nBEGIN\n  IF NOT EXISTS (\n    SELECT 1 FROM pg_constraint c JOIN pg_namespace n ON n.oid = c.connamespace\n    WHERE c.conname = {} AND n.nspname = {}\n  ) THEN\n    {};\n  END IF;\nEND\n$$",
            quote_literal(constraint),
            quote_literal(&from_schema),
            alter
        )));
    }

    Ok(out)
}

fn lookup_table<'a>(config: &'a FullConfig, id: &str) -> Result<&'a TableConfig, ConfigError> {
    config.table(id).ok_or_else(|| ConfigError::MissingReference {
        kind: "table",
        id: id.to_string(),
    })
}

/// Apply declarations to the database. Schema statements run in one transaction;
/// store errors (connection, incompatible existing objects) are returned untouched.
pub async fn apply_migrations(pool: &PgPool, config: &FullConfig) -> Result<(), AppError> {
    let statements = ddl_statements(config)?;

    let mut tx = pool.begin().await?;
    let mut applied = 0usize;
    for stmt in &statements {
        if let DdlStatement::Schema(sql) = stmt {
            tracing::debug!(sql = %sql, "ddl");
            sqlx::query(sql).execute(&mut *tx).await?;
            applied += 1;
        }
    }
    tx.commit().await?;

    for stmt in &statements {
        if let DdlStatement::Comment(sql) = stmt {
            if let Err(e) = sqlx::query(sql).execute(pool).await {
                tracing::warn!(sql = %sql, error = %e, "comment not applied");
            }
        }
    }

    tracing::info!(
        tables = config.tables.len(),
        statements = applied,
        "schema materialized"
    );
    Ok(())
}
