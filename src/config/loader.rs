//! Turn validated declarations into the resolved model.

use crate::config::resolved::{ColumnInfo, Navigation, NavigationKind, ResolvedEntity, ResolvedModel};
use crate::config::types::*;
use crate::config::{default_schema_id, validate, FullConfig};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Foreign key with table ids and column names filled in.
struct ForeignKey<'a> {
    from_table: &'a str,
    from_column: &'a str,
    to_table: &'a str,
    to_column: &'a str,
}

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;
    let default_sid = default_schema_id(config)?;

    let schemas_by_id: HashMap<_, _> = config.schemas.iter().map(|s| (s.id.as_str(), s)).collect();
    let tables_by_id: HashMap<_, _> = config.tables.iter().map(|t| (t.id.as_str(), t)).collect();
    let entity_name_by_table: HashMap<&str, &str> = config
        .entities
        .iter()
        .map(|e| (e.table_id.as_str(), e.name.as_str()))
        .collect();

    let foreign_keys: Vec<ForeignKey<'_>> = config
        .relationships
        .iter()
        .filter_map(|r| {
            let from = config.column(&r.from_column_id)?;
            let to = config.column(&r.to_column_id)?;
            Some(ForeignKey {
                from_table: from.table_id.as_str(),
                from_column: from.name.as_str(),
                to_table: to.table_id.as_str(),
                to_column: to.name.as_str(),
            })
        })
        .collect();

    let link_tables: HashSet<&str> = config
        .tables
        .iter()
        .filter(|t| is_link_table(config, t, &foreign_keys))
        .map(|t| t.id.as_str())
        .collect();

    let mut entities = Vec::new();
    let mut entity_by_name = HashMap::new();

    for e in &config.entities {
        let table = tables_by_id
            .get(e.table_id.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: e.table_id.clone(),
            })?;
        let sid = table.schema_id.as_deref().unwrap_or(default_sid);
        let schema = schemas_by_id
            .get(sid)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "schema",
                id: sid.to_string(),
            })?;

        let pk_columns: Vec<String> = table.primary_key.columns().into_iter().map(String::from).collect();
        let mut validation: HashMap<String, ValidationRule> = HashMap::new();
        let columns: Vec<ColumnInfo> = config
            .columns_of(&table.id)
            .map(|c| {
                let has_default = c.type_.is_serial();
                let derived = ValidationRule {
                    required: (!c.nullable && !has_default).then_some(true),
                    max_length: c.type_.max_length(),
                    ..ValidationRule::default()
                };
                if derived.required.is_some() || derived.max_length.is_some() {
                    validation.insert(c.name.clone(), derived);
                }
                ColumnInfo {
                    name: c.name.clone(),
                    sql_type: c.type_.to_sql(),
                    nullable: c.nullable,
                    has_default,
                    is_key: pk_columns.contains(&c.name),
                    pg_cast: column_pg_cast(&c.type_),
                }
            })
            .collect();

        for (col, rule) in &e.validation {
            let merged = validation.entry(col.clone()).or_default();
            merge_rule(merged, rule);
        }

        let navigations = build_navigations(
            &table.id,
            &foreign_keys,
            &entity_name_by_table,
            &link_tables,
        );
        let entity = ResolvedEntity {
            table_id: table.id.clone(),
            name: e.name.clone(),
            schema_name: schema.name.clone(),
            table_name: table.name.clone(),
            pk_columns,
            columns,
            navigations,
            validation,
            is_link: link_tables.contains(table.id.as_str()),
        };
        entity_by_name.insert(e.name.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_name,
    })
}

fn merge_rule(into: &mut ValidationRule, extra: &ValidationRule) {
    if extra.required.is_some() {
        into.required = extra.required;
    }
    if extra.max_length.is_some() {
        into.max_length = extra.max_length;
    }
    if extra.min_length.is_some() {
        into.min_length = extra.min_length;
    }
    if extra.pattern.is_some() {
        into.pattern = extra.pattern.clone();
    }
    if extra.minimum.is_some() {
        into.minimum = extra.minimum;
    }
    if extra.maximum.is_some() {
        into.maximum = extra.maximum;
    }
}

fn is_link_table(config: &FullConfig, table: &TableConfig, foreign_keys: &[ForeignKey<'_>]) -> bool {
    let pk = table.primary_key.columns();
    if pk.len() < 2 {
        return false;
    }
    let all_columns_in_key = config.columns_of(&table.id).all(|c| pk.contains(&c.name.as_str()));
    let all_keys_referencing = pk.iter().all(|col| {
        foreign_keys
            .iter()
            .any(|fk| fk.from_table == table.id && fk.from_column == *col)
    });
    all_columns_in_key && all_keys_referencing
}

fn build_navigations(
    our_table_id: &str,
    foreign_keys: &[ForeignKey<'_>],
    entity_name_by_table: &HashMap<&str, &str>,
    link_tables: &HashSet<&str>,
) -> Vec<Navigation> {
    let mut navigations = Vec::new();
    for fk in foreign_keys {
        if fk.from_table == our_table_id {
            if let Some(related) = entity_name_by_table.get(fk.to_table) {
                navigations.push(Navigation {
                    name: related.to_string(),
                    kind: NavigationKind::ToOne,
                    related_entity: related.to_string(),
                    our_key_column: fk.from_column.to_string(),
                    their_key_column: fk.to_column.to_string(),
                });
            }
        }
        if fk.to_table != our_table_id {
            continue;
        }
        if link_tables.contains(fk.from_table) {
            // The other side of the link becomes a many-to-many navigation.
            let Some(link_entity) = entity_name_by_table.get(fk.from_table) else { continue };
            for other in foreign_keys
                .iter()
                .filter(|o| o.from_table == fk.from_table && o.from_column != fk.from_column)
            {
                if let Some(related) = entity_name_by_table.get(other.to_table) {
                    navigations.push(Navigation {
                        name: format!("{}s", related),
                        kind: NavigationKind::Through {
                            link_entity: link_entity.to_string(),
                            link_our_column: fk.from_column.to_string(),
                            link_their_column: other.from_column.to_string(),
                        },
                        related_entity: related.to_string(),
                        our_key_column: fk.to_column.to_string(),
                        their_key_column: other.to_column.to_string(),
                    });
                }
            }
        } else if let Some(related) = entity_name_by_table.get(fk.from_table) {
            navigations.push(Navigation {
                name: format!("{}s", related),
                kind: NavigationKind::ToMany,
                related_entity: related.to_string(),
                our_key_column: fk.to_column.to_string(),
                their_key_column: fk.from_column.to_string(),
            });
        }
    }
    navigations
}

fn column_pg_cast(ty: &ColumnTypeConfig) -> Option<String> {
    let lower = ty.base_name().to_lowercase();
    if lower == "timestamptz" || lower == "timestamp with time zone" {
        Some("timestamptz".into())
    } else if lower == "timestamp" || lower.starts_with("timestamp ") {
        Some("timestamp".into())
    } else if lower == "date" {
        Some("date".into())
    } else {
        None
    }
}
