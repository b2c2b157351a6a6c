//! Outing schema: relational schema for tours, guides, qualifications, locations and
//! scheduled outings, materialized into PostgreSQL.

pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod service;
pub mod sql;
pub mod tourism;

pub use config::{resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use db::{bootstrap, connect, ensure_database_exists, Database, DbConfig};
pub use error::{AppError, ConfigError};
pub use migration::{apply_migrations, ddl_statements};
pub use service::{CrudService, LinkService};
