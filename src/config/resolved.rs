//! Resolved entity model: declarations validated and flattened for the row layer.

use crate::config::ValidationRule;
use crate::error::AppError;
use std::collections::HashMap;

/// How a related entity is reached from this one.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationKind {
    /// We hold the foreign key.
    ToOne,
    /// They hold a foreign key to us.
    ToMany,
    /// Many-to-many through a link table holding foreign keys to both sides.
    Through {
        link_entity: String,
        /// Link column referencing us.
        link_our_column: String,
        /// Link column referencing them.
        link_their_column: String,
    },
}

#[derive(Clone, Debug)]
pub struct Navigation {
    pub name: String,
    pub kind: NavigationKind,
    pub related_entity: String,
    /// Our column used in the join (our FK for to_one; the referenced column otherwise).
    pub our_key_column: String,
    /// Their column used in the join.
    pub their_key_column: String,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// Type as written in DDL.
    pub sql_type: String,
    pub nullable: bool,
    /// Value comes from a sequence when omitted.
    pub has_default: bool,
    pub is_key: bool,
    /// PostgreSQL type name for SQL casts (e.g. "date") when binding string values.
    pub pg_cast: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table_id: String,
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub pk_columns: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    pub navigations: Vec<Navigation>,
    pub validation: HashMap<String, ValidationRule>,
    /// Pure link table: every column is part of the key and references another table.
    pub is_link: bool,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn navigation(&self, name: &str) -> Option<&Navigation> {
        self.navigations.iter().find(|n| n.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_name: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entity_by_name.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&ResolvedEntity, AppError> {
        self.entity(name)
            .ok_or_else(|| AppError::NotFound(format!("entity {}", name)))
    }
}
