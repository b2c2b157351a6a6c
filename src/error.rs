//! Typed errors. Store errors are passed through untranslated.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: table {table_id} column {column}")]
    InvalidPrimaryKey { table_id: String, column: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("duplicate entity name: {0}")]
    DuplicateEntity(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn database_error(&self) -> Option<&(dyn sqlx::error::DatabaseError + 'static)> {
        match self {
            AppError::Db(sqlx::Error::Database(e)) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// SQLSTATE reported by PostgreSQL, if this is a store error.
    pub fn sqlstate(&self) -> Option<String> {
        self.database_error()
            .and_then(|e| e.code())
            .map(|c| c.into_owned())
    }

    /// 23505: duplicate primary key or unique column.
    pub fn is_unique_violation(&self) -> bool {
        self.database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false)
    }

    /// 23503: referenced row does not exist (or is still referenced).
    pub fn is_foreign_key_violation(&self) -> bool {
        self.database_error()
            .map(|e| e.is_foreign_key_violation())
            .unwrap_or(false)
    }

    /// 23502.
    pub fn is_not_null_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23502")
    }

    /// 3D000: the database named in the connection URL does not exist.
    pub fn is_missing_database(&self) -> bool {
        self.sqlstate().as_deref() == Some("3D000")
    }
}
