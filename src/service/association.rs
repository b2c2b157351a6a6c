//! Many-to-many links (rows of a pure link table) reached through a navigation.

use crate::config::{NavigationKind, ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::CrudService;
use crate::sql::{delete, insert_ignore_existing};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct LinkService;

impl LinkService {
    /// Link `ours` (key of a row of `entity`) to `theirs` over `navigation`.
    /// Returns false when the pair was already linked.
    pub async fn link(
        pool: &PgPool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        navigation: &str,
        ours: &Value,
        theirs: &Value,
    ) -> Result<bool, AppError> {
        let (link, body) = link_row(model, entity, navigation, ours, theirs)?;
        let q = insert_ignore_existing(link, &body);
        let inserted = CrudService::fetch_optional(pool, &q).await?;
        if inserted.is_some() {
            tracing::debug!(link = %link.name, "linked");
        }
        Ok(inserted.is_some())
    }

    /// Remove the link between `ours` and `theirs`. Returns false when there was none.
    pub async fn unlink(
        pool: &PgPool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        navigation: &str,
        ours: &Value,
        theirs: &Value,
    ) -> Result<bool, AppError> {
        let (link, body) = link_row(model, entity, navigation, ours, theirs)?;
        let key = link
            .pk_columns
            .iter()
            .map(|c| body.get(c).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>();
        let q = delete(link, &key);
        Ok(CrudService::fetch_optional(pool, &q).await?.is_some())
    }
}

fn through<'a>(entity: &'a ResolvedEntity, navigation: &str) -> Result<(&'a str, &'a str, &'a str), AppError> {
    let nav = entity.navigation(navigation).ok_or_else(|| {
        AppError::NotFound(format!("navigation {} on {}", navigation, entity.name))
    })?;
    match &nav.kind {
        NavigationKind::Through {
            link_entity,
            link_our_column,
            link_their_column,
        } => Ok((link_entity.as_str(), link_our_column.as_str(), link_their_column.as_str())),
        _ => Err(AppError::BadRequest(format!(
            "{} on {} is not a many-to-many navigation",
            navigation, entity.name
        ))),
    }
}

fn link_row<'m>(
    model: &'m ResolvedModel,
    entity: &ResolvedEntity,
    navigation: &str,
    ours: &Value,
    theirs: &Value,
) -> Result<(&'m ResolvedEntity, HashMap<String, Value>), AppError> {
    let (link_entity, link_our_column, link_their_column) = through(entity, navigation)?;
    let link = model.require(link_entity)?;
    let mut body = HashMap::new();
    body.insert(link_our_column.to_string(), ours.clone());
    body.insert(link_their_column.to_string(), theirs.clone());
    Ok((link, body))
}
