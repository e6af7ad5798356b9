//! carotid-persistence
//!
//! Implementación Postgres (Diesel) del almacén de metadatos de mallas que
//! usa `FileLifecycleOrchestrator`.
//!
//! Módulos:
//! - `pg`: pool, reintentos y `PgFileRecordStore`.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgFileRecordStore, PgPool, PoolProvider};
