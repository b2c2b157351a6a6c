//! Generic row operations against PostgreSQL.

use crate::config::{NavigationKind, ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::sql::{
    delete, insert, select_by_column_in, select_by_key, select_list, select_through_link, update,
    PgBindValue, QueryBuf,
};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;

const DEFAULT_LIMIT: u32 = 100;
/// Largest page a single list query returns.
pub const MAX_PAGE: u32 = 1000;

pub struct CrudService;

impl CrudService {
    /// List rows with optional filters (exact match), limit (default 100, max 1000), offset (default 0).
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_PAGE);
        let offset = offset.unwrap_or(0);
        let q = select_list(entity, filters, Some(limit), Some(offset));
        Self::fetch_all(pool, &q).await
    }

    /// Every row matching the filters, read page by page until a short page comes back.
    pub async fn list_all(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
    ) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::new();
        loop {
            let offset = u32::try_from(out.len())
                .map_err(|_| AppError::BadRequest(format!("{} has too many rows to list", entity.name)))?;
            let page = Self::list(pool, entity, filters, Some(MAX_PAGE), Some(offset)).await?;
            let short = page.len() < MAX_PAGE as usize;
            out.extend(page);
            if short {
                return Ok(out);
            }
        }
    }

    /// Fetch one row by full primary key. Returns JSON object or None.
    pub async fn read(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
    ) -> Result<Option<Value>, AppError> {
        check_key(entity, key)?;
        let q = select_by_key(entity, key);
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row after validating it. Sequence-backed keys may be omitted. Returns created row.
    pub async fn create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        RequestValidator::validate(body, &entity.validation)?;
        let q = insert(entity, body);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update non-key columns of one row. Returns updated row, None when the key matches nothing.
    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        check_key(entity, key)?;
        RequestValidator::validate_partial(body, &entity.validation)?;
        let q = update(entity, key, body);
        Self::fetch_optional(pool, &q).await
    }

    /// Delete one row by key. Returns deleted row or None.
    pub async fn delete(
        pool: &PgPool,
        entity: &ResolvedEntity,
        key: &[Value],
    ) -> Result<Option<Value>, AppError> {
        check_key(entity, key)?;
        let q = delete(entity, key);
        Self::fetch_optional(pool, &q).await
    }

    /// Bulk create in one transaction; any failure rolls back every row. Returns created rows in input order.
    pub async fn bulk_create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        items: &[HashMap<String, Value>],
    ) -> Result<Vec<Value>, AppError> {
        for body in items {
            RequestValidator::validate(body, &entity.validation)?;
        }
        let mut out = Vec::with_capacity(items.len());
        let mut tx = pool.begin().await?;
        for body in items {
            let q = insert(entity, body);
            let row = Self::fetch_optional(&mut *tx, &q).await?.unwrap_or(Value::Null);
            out.push(row);
        }
        tx.commit().await?;
        Ok(out)
    }

    /// Fetch rows from entity where column IN (values).
    pub async fn fetch_where_column_in(
        pool: &PgPool,
        entity: &ResolvedEntity,
        column_name: &str,
        values: &[Value],
    ) -> Result<Vec<Value>, AppError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let q = select_by_column_in(entity, column_name, values);
        Self::fetch_all(pool, &q).await
    }

    /// Follow a navigation from `row` (a row of `entity`). To-one navigations yield at most one row.
    pub async fn related(
        pool: &PgPool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        row: &Value,
        navigation: &str,
    ) -> Result<Vec<Value>, AppError> {
        let nav = entity.navigation(navigation).ok_or_else(|| {
            AppError::NotFound(format!("navigation {} on {}", navigation, entity.name))
        })?;
        let related = model.require(&nav.related_entity)?;
        let our_value = row.get(&nav.our_key_column).cloned().unwrap_or(Value::Null);
        if our_value.is_null() {
            return Ok(Vec::new());
        }
        match &nav.kind {
            NavigationKind::ToOne | NavigationKind::ToMany => {
                Self::fetch_where_column_in(pool, related, &nav.their_key_column, &[our_value]).await
            }
            NavigationKind::Through {
                link_entity,
                link_our_column,
                link_their_column,
            } => {
                let link = model.require(link_entity)?;
                let q = select_through_link(
                    related,
                    &nav.their_key_column,
                    link,
                    link_our_column,
                    link_their_column,
                    &our_value,
                );
                Self::fetch_all(pool, &q).await
            }
        }
    }

    /// Primary key values of `row`, ordered like `entity.pk_columns`.
    pub fn key_of(entity: &ResolvedEntity, row: &Value) -> Result<Vec<Value>, AppError> {
        entity
            .pk_columns
            .iter()
            .map(|c| {
                row.get(c)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .ok_or_else(|| AppError::Validation(format!("row has no '{}'", c)))
            })
            .collect()
    }

    pub(crate) async fn fetch_optional<'e, E>(executor: E, q: &QueryBuf) -> Result<Option<Value>, AppError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(q).fetch_optional(executor).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    pub(crate) async fn fetch_all<'e, E>(executor: E, q: &QueryBuf) -> Result<Vec<Value>, AppError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(q).fetch_all(executor).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn check_key(entity: &ResolvedEntity, key: &[Value]) -> Result<(), AppError> {
    if key.len() != entity.pk_columns.len() {
        return Err(AppError::BadRequest(format!(
            "{} key has {} column(s), got {}",
            entity.name,
            entity.pk_columns.len(),
            key.len()
        )));
    }
    Ok(())
}

fn bind_all(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
