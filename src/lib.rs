//! 统一的数据访问层：MySQL 链式查询、Redis、MongoDB 与 Elasticsearch。
//!
//! ```no_run
//! use unidb::{MySqlConfig, RedisConfig};
//! use unidb::query::UpdateOptions;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let users = unidb::db("user", &MySqlConfig::new("localhost", "root", "", "app")).await?;
//! users.query().where_eq("id", 1).update(&serde_json::json!({"name": "ann"}), UpdateOptions::default()).await?;
//!
//! let cache = unidb::rdb(&RedisConfig::new("localhost")).await?;
//! cache.set("greeting", "hello", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod models;
pub mod utils;

pub use config::{AdapterConfig, Driver, EsConfig, MongoConfig, MySqlConfig, RedisConfig};
pub use db::query;
pub use db::schema::{FieldDefault, FieldDef, FieldKind, Schema};
pub use db::{db, edb, mdb, new_adapter, rdb, DbAdapter, DocModel, DocStore, KvStore, KvValue, MySqlDb, SearchIndex};
pub use models::{ExecResult, SqlValue, TxOutcome, UpdateSummary};
