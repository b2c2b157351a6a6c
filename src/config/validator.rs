//! Declaration validation: identifiers and referential consistency.

use crate::config::FullConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const REFERENTIAL_ACTIONS: &[&str] = &["NO ACTION", "RESTRICT", "CASCADE", "SET NULL", "SET DEFAULT"];

/// Default schema id when tables omit schema_id.
pub fn default_schema_id(config: &FullConfig) -> Result<&str, ConfigError> {
    config
        .schemas
        .first()
        .map(|s| s.id.as_str())
        .ok_or_else(|| ConfigError::Validation("at least one schema required".into()))
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let default_sid = default_schema_id(config)?;
    let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let check_ident = |name: &str| -> Result<(), ConfigError> {
        if ident.is_match(name) {
            Ok(())
        } else {
            Err(ConfigError::InvalidIdentifier(name.to_string()))
        }
    };

    let schema_ids: HashSet<&str> = config.schemas.iter().map(|s| s.id.as_str()).collect();
    for s in &config.schemas {
        check_ident(&s.name)?;
    }

    let mut table_ids = HashSet::new();
    for t in &config.tables {
        check_ident(&t.name)?;
        if !table_ids.insert(t.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate table id {}", t.id)));
        }
        let sid = t.schema_id.as_deref().unwrap_or(default_sid);
        if !schema_ids.contains(sid) {
            return Err(ConfigError::MissingReference {
                kind: "schema",
                id: sid.to_string(),
            });
        }
    }

    let mut column_ids = HashSet::new();
    let mut column_names = HashSet::new();
    for c in &config.columns {
        check_ident(&c.name)?;
        if !table_ids.contains(c.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: c.table_id.clone(),
            });
        }
        if !column_ids.insert(c.id.as_str()) || !column_names.insert((c.table_id.as_str(), c.name.as_str())) {
            return Err(ConfigError::Validation(format!("duplicate column {}", c.id)));
        }
    }

    for t in &config.tables {
        for pk in t.primary_key.columns() {
            if !column_names.contains(&(t.id.as_str(), pk)) {
                return Err(ConfigError::InvalidPrimaryKey {
                    table_id: t.id.clone(),
                    column: pk.to_string(),
                });
            }
        }
        for col in t.unique.iter().flatten() {
            if !column_names.contains(&(t.id.as_str(), col.as_str())) {
                return Err(ConfigError::MissingReference {
                    kind: "unique column",
                    id: format!("{}.{}", t.id, col),
                });
            }
        }
        for ch in &t.check {
            check_ident(&ch.name)?;
        }
    }

    for idx in &config.indexes {
        check_ident(&idx.name)?;
        if !table_ids.contains(idx.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: idx.table_id.clone(),
            });
        }
        for col in &idx.columns {
            if !column_names.contains(&(idx.table_id.as_str(), col.as_str())) {
                return Err(ConfigError::MissingReference {
                    kind: "index column",
                    id: format!("{}.{}", idx.table_id, col),
                });
            }
        }
    }

    for r in &config.relationships {
        check_ident(r.constraint_name())?;
        for action in [&r.on_update, &r.on_delete].into_iter().flatten() {
            if !REFERENTIAL_ACTIONS.contains(&action.to_uppercase().as_str()) {
                return Err(ConfigError::Validation(format!(
                    "relationship {}: unknown referential action '{}'",
                    r.id, action
                )));
            }
        }
        if !column_ids.contains(r.from_column_id.as_str()) || !column_ids.contains(r.to_column_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "relationship",
                id: r.id.clone(),
            });
        }
    }

    let mut entity_names = HashSet::new();
    for e in &config.entities {
        if !table_ids.contains(e.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: e.table_id.clone(),
            });
        }
        if !entity_names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
        for col in e.validation.keys() {
            if !column_names.contains(&(e.table_id.as_str(), col.as_str())) {
                return Err(ConfigError::MissingReference {
                    kind: "validated column",
                    id: format!("{}.{}", e.table_id, col),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tourism;

    #[test]
    fn tourism_registry_is_valid() {
        validate(&tourism::registry().unwrap()).unwrap();
    }

    #[test]
    fn rejects_primary_key_on_unknown_column() {
        let mut config = tourism::registry().unwrap();
        let t = config.tables.iter_mut().find(|t| t.id == "tours").unwrap();
        t.primary_key = crate::config::PrimaryKeyConfig::Single("title".into());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPrimaryKey { ref column, .. }) if column == "title"
        ));
    }

    #[test]
    fn rejects_dangling_relationship() {
        let mut config = tourism::registry().unwrap();
        config.relationships[0].to_column_id = "tours.title".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "relationship", .. })
        ));
    }

    #[test]
    fn rejects_unsafe_identifier() {
        let mut config = tourism::registry().unwrap();
        config.tables[0].name = "tours; drop table guides".into();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidIdentifier(_))));
    }

    #[test]
    fn rejects_unknown_referential_action() {
        let mut config = tourism::registry().unwrap();
        config.relationships[0].on_delete = Some("cascade; drop table tours".into());
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
        config.relationships[0].on_delete = Some("cascade".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_duplicate_entity_name() {
        let mut config = tourism::registry().unwrap();
        config.entities[1].name = config.entities[0].name.clone();
        assert!(matches!(validate(&config), Err(ConfigError::DuplicateEntity(_))));
    }

    #[test]
    fn requires_a_schema() {
        let mut config = tourism::registry().unwrap();
        config.schemas.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }
}
