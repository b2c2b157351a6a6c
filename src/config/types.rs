//! Raw declaration types matching the registry JSON (`schema/*.json`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableCheck {
    pub name: String,
    pub expression: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.as_str()],
            PrimaryKeyConfig::Composite(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub id: String,
    /// Falls back to the first declared schema when absent.
    #[serde(default)]
    pub schema_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub primary_key: PrimaryKeyConfig,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub check: Vec<TableCheck>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypeConfig {
    Simple(String),
    Parameterized { name: String, params: Option<Vec<u32>> },
}

impl ColumnTypeConfig {
    /// Base type name without parameters, e.g. `varchar` for `varchar(400)`.
    pub fn base_name(&self) -> &str {
        match self {
            ColumnTypeConfig::Simple(s) => s.as_str(),
            ColumnTypeConfig::Parameterized { name, .. } => name.as_str(),
        }
    }

    /// Type as written in DDL.
    pub fn to_sql(&self) -> String {
        match self {
            ColumnTypeConfig::Simple(s) => s.clone(),
            ColumnTypeConfig::Parameterized { name, params } => {
                let p = params
                    .as_ref()
                    .map(|v| v.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                if p.is_empty() {
                    name.clone()
                } else {
                    format!("{}({})", name, p)
                }
            }
        }
    }

    /// Declared length for character types (`varchar(50)` -> 50).
    pub fn max_length(&self) -> Option<u32> {
        match self {
            ColumnTypeConfig::Parameterized { name, params: Some(p) } => {
                let lower = name.to_lowercase();
                if lower == "varchar" || lower == "character varying" || lower == "char" {
                    p.first().copied()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Serial types get their value from a sequence.
    pub fn is_serial(&self) -> bool {
        let lower = self.base_name().to_lowercase();
        lower == "serial" || lower == "bigserial" || lower == "smallserial"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    pub table_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnTypeConfig,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub id: String,
    pub table_id: String,
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Foreign key from one column to another. Tables are taken from the columns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub id: String,
    pub from_column_id: String,
    pub to_column_id: String,
    #[serde(default)]
    pub on_update: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    /// Constraint name; defaults to `id`.
    #[serde(default)]
    pub name: Option<String>,
}

impl RelationshipConfig {
    pub fn constraint_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub table_id: String,
    pub name: String,
    /// Extra rules on top of the ones derived from column declarations.
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

/// All declarations in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl FullConfig {
    pub fn from_json(s: &str) -> Result<Self, crate::error::ConfigError> {
        serde_json::from_str(s).map_err(|e| crate::error::ConfigError::Load(e.to_string()))
    }

    pub fn table(&self, id: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn columns_of<'a>(&'a self, table_id: &'a str) -> impl Iterator<Item = &'a ColumnConfig> + 'a {
        self.columns.iter().filter(move |c| c.table_id == table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_accepts_string_or_list() {
        let t: TableConfig =
            serde_json::from_str(r#"{"id":"a","name":"a","primary_key":"id"}"#).unwrap();
        assert_eq!(t.primary_key.columns(), vec!["id"]);
        let t: TableConfig =
            serde_json::from_str(r#"{"id":"b","name":"b","primary_key":["x","y"]}"#).unwrap();
        assert_eq!(t.primary_key.columns(), vec!["x", "y"]);
    }

    #[test]
    fn column_type_rendering() {
        let c: ColumnConfig = serde_json::from_str(
            r#"{"id":"t.d","table_id":"t","name":"d","type":{"name":"varchar","params":[400]}}"#,
        )
        .unwrap();
        assert_eq!(c.type_.to_sql(), "varchar(400)");
        assert_eq!(c.type_.max_length(), Some(400));
        assert!(c.nullable);

        let serial = ColumnTypeConfig::Simple("serial".into());
        assert!(serial.is_serial());
        assert_eq!(serial.max_length(), None);
    }
}
