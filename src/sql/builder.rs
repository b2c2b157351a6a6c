//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::config::ResolvedEntity;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Quote identifier for PostgreSQL (safe: only from validated declarations).
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote a string literal.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn entity_table(entity: &ResolvedEntity) -> String {
    qualified_table(&entity.schema_name, &entity.table_name)
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder for a column value, with a cast when the column needs one.
    fn placeholder(&mut self, entity: &ResolvedEntity, column: &str, v: Value) -> String {
        let n = self.push_param(v);
        entity
            .column(column)
            .and_then(|c| c.pg_cast.as_deref())
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }

    /// `"a" = $n AND "b" = $m` over the primary key.
    fn key_predicate(&mut self, entity: &ResolvedEntity, alias: Option<&str>, key: &[Value]) -> String {
        let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
        entity
            .pk_columns
            .iter()
            .zip(key)
            .map(|(col, v)| {
                let ph = self.placeholder(entity, col, v.clone());
                format!("{}{} = {}", prefix, quote_ident(col), ph)
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn select_column_list(entity: &ResolvedEntity, alias: Option<&str>) -> String {
    let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
    entity
        .columns
        .iter()
        .map(|c| format!("{}{}", prefix, quote_ident(&c.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn order_by_key(entity: &ResolvedEntity, alias: Option<&str>) -> String {
    let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
    entity
        .pk_columns
        .iter()
        .map(|c| format!("{}{}", prefix, quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by full primary key. `key` is ordered like `entity.pk_columns`.
pub fn select_by_key(entity: &ResolvedEntity, key: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let predicate = q.key_predicate(entity, None, key);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(entity, None),
        entity_table(entity),
        predicate
    );
    q
}

/// SELECT list with optional filters (exact match per column), ORDER BY key, optional LIMIT/OFFSET.
/// Filters on unknown columns are ignored.
pub fn select_list(
    entity: &ResolvedEntity,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let col_names: HashSet<&str> = entity.columns.iter().map(|c| c.name.as_str()).collect();

    let mut where_parts = Vec::new();
    for (col, val) in filters {
        if col_names.contains(col.as_str()) {
            let ph = q.placeholder(entity, col, val.clone());
            where_parts.push(format!("{} = {}", quote_ident(col), ph));
        }
    }

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n.min(1000))).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(entity, None),
        entity_table(entity),
        where_clause,
        order_by_key(entity, None),
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT rows where column IN ($1, $2, ...) ORDER BY key. Used for navigations.
pub fn select_by_column_in(entity: &ResolvedEntity, column_name: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = entity_table(entity);
    let cols = select_column_list(entity, None);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let placeholders: Vec<String> = values
        .iter()
        .map(|v| q.placeholder(entity, column_name, v.clone()))
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quote_ident(column_name),
        placeholders.join(", "),
        order_by_key(entity, None)
    );
    q
}

/// SELECT target rows joined through a link table:
/// `target.their_key = link.link_their_column AND link.link_our_column = $1`.
pub fn select_through_link(
    target: &ResolvedEntity,
    their_key: &str,
    link: &ResolvedEntity,
    link_our_column: &str,
    link_their_column: &str,
    our_value: &Value,
) -> QueryBuf {
    const TARGET_ALIAS: &str = "t";
    const LINK_ALIAS: &str = "l";
    let mut q = QueryBuf::new();
    let ph = q.placeholder(link, link_our_column, our_value.clone());
    q.sql = format!(
        "SELECT {} FROM {} {} JOIN {} {} ON {}.{} = {}.{} WHERE {}.{} = {} ORDER BY {}",
        select_column_list(target, Some(TARGET_ALIAS)),
        entity_table(target),
        TARGET_ALIAS,
        entity_table(link),
        LINK_ALIAS,
        TARGET_ALIAS,
        quote_ident(their_key),
        LINK_ALIAS,
        quote_ident(link_their_column),
        LINK_ALIAS,
        quote_ident(link_our_column),
        ph,
        order_by_key(target, Some(TARGET_ALIAS))
    );
    q
}

/// INSERT: columns and placeholders from entity; values from body.
/// Omits columns with a sequence default when body does not provide a value.
/// Uses SQL cast (e.g. $n::date) for temporal columns so string values bind correctly.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        let val = match body.get(&c.name) {
            Some(Value::Null) | None if c.has_default => continue,
            Some(v) => v.clone(),
            None => Value::Null,
        };
        placeholders.push(q.placeholder(entity, &c.name, val));
        cols.push(quote_ident(&c.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        entity_table(entity),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity, None)
    );
    q
}

/// INSERT that does nothing when the row already exists.
pub fn insert_ignore_existing(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = insert(entity, body);
    let returning = format!(" RETURNING {}", select_column_list(entity, None));
    if let Some(stripped) = q.sql.strip_suffix(&returning) {
        q.sql = format!("{} ON CONFLICT DO NOTHING{}", stripped, returning);
    }
    q
}

/// UPDATE by key: SET only non-key columns present in body.
/// With nothing to set, degrades to a SELECT by key.
pub fn update(entity: &ResolvedEntity, key: &[Value], body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    // Stable order keeps generated SQL deterministic.
    for c in &entity.columns {
        if c.is_key {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        let ph = q.placeholder(entity, &c.name, v.clone());
        sets.push(format!("{} = {}", quote_ident(&c.name), ph));
    }
    if sets.is_empty() {
        return select_by_key(entity, key);
    }
    let predicate = q.key_predicate(entity, None, key);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        entity_table(entity),
        sets.join(", "),
        predicate,
        select_column_list(entity, None)
    );
    q
}

/// DELETE by key.
pub fn delete(entity: &ResolvedEntity, key: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let predicate = q.key_predicate(entity, None, key);
    q.sql = format!(
        "DELETE FROM {} WHERE {} RETURNING {}",
        entity_table(entity),
        predicate,
        select_column_list(entity, None)
    );
    q
}
