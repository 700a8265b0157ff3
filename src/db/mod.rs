mod adapter;
mod connection;
pub mod adapters;
pub mod query;
pub mod schema;

pub use adapter::{new_adapter, DbAdapter};
pub use adapters::{DocModel, DocStore, ExpiryWatch, KvStore, KvValue, MySqlDb, SchemaOptions, SearchIndex};
pub use connection::connect_pool;

use anyhow::Result;

use crate::config::{EsConfig, MongoConfig, MySqlConfig, RedisConfig};
use query::SqlTable;

/// 连接 MySQL 并返回一张表。每次调用都会新建连接池，多张表共用连接池时请用 [`MySqlDb::table`]
pub async fn db(table: &str, config: &MySqlConfig) -> Result<SqlTable> {
    Ok(MySqlDb::connect(config).await?.table(table))
}

/// 连接 Redis
pub async fn rdb(config: &RedisConfig) -> Result<KvStore> {
    KvStore::connect(config).await
}

/// 连接 MongoDB 并返回一个待声明结构的模型
pub async fn mdb(model: &str, config: &MongoConfig) -> Result<DocModel> {
    Ok(DocStore::connect(config).await?.model(model))
}

/// 创建 Elasticsearch 客户端，不会立即发起请求
pub fn edb(config: &EsConfig) -> Result<SearchIndex> {
    SearchIndex::connect(config)
}
