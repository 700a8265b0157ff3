use anyhow::Result;
use async_trait::async_trait;

use crate::config::AdapterConfig;

use crate::db::adapters::elasticsearch::SearchIndex;
use crate::db::adapters::mongodb::DocStore;
use crate::db::adapters::mysql::MySqlDb;
use crate::db::adapters::redis::KvStore;

/// 所有数据源共有的最小接口：名字和连通性检查
#[async_trait]
pub trait DbAdapter: Send + Sync {
    fn driver_name(&self) -> &'static str;
    async fn ping(&self) -> Result<()>;
    async fn get_version(&self) -> Result<String>;
}

pub async fn new_adapter(config: &AdapterConfig) -> Result<Box<dyn DbAdapter>> {
    match config {
        AdapterConfig::Mysql(c) => Ok(Box::new(MySqlDb::connect(c).await?)),
        AdapterConfig::Redis(c) => Ok(Box::new(KvStore::connect(c).await?)),
        AdapterConfig::Mongodb(c) => Ok(Box::new(DocStore::connect(c).await?)),
        AdapterConfig::Elasticsearch(c) => Ok(Box::new(SearchIndex::connect(c)?)),
    }
}
