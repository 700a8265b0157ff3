use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{MySqlPool, Row};

use crate::config::MySqlConfig;
use crate::db::adapter::DbAdapter;
use crate::db::connection::connect_pool;
use crate::db::query::{self, SqlTable, TxScope};
use crate::models::TxOutcome;

/// MySQL 连接池，按表名产出 [`SqlTable`]
#[derive(Clone)]
pub struct MySqlDb {
    pool: MySqlPool,
    config: MySqlConfig,
}

impl MySqlDb {
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let pool = connect_pool(config).await?;
        Ok(Self { pool, config: config.clone() })
    }

    pub fn from_pool(pool: MySqlPool, config: MySqlConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn config(&self) -> &MySqlConfig {
        &self.config
    }

    pub fn table(&self, name: &str) -> SqlTable {
        query::pooled(name, &self.pool, self.config.log_sql)
    }

    /// 开启事务。
    ///
    /// 从连接池取出一条连接并 `BEGIN`，回调拿到的 [`TxScope`] 创建的表都在这条连接上
    /// 执行。回调返回 `Ok` 时提交，返回 `Err` 时回滚，结果是
    /// [`TxOutcome::RolledBack`]，不会吞掉错误。连接总会归还连接池。
    ///
    /// ```no_run
    /// # async fn demo(db: unidb::MySqlDb) -> anyhow::Result<()> {
    /// use unidb::query::UpdateOptions;
    ///
    /// let outcome = db
    ///     .transaction(|tx| async move {
    ///         tx.table("account").query().where_eq("id", 1).decr("balance", 100, UpdateOptions::default()).await?;
    ///         tx.table("account").query().where_eq("id", 2).incr("balance", 100, UpdateOptions::default()).await?;
    ///         Ok(())
    ///     })
    ///     .await?;
    /// outcome.into_result()?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<T, F, Fut>(&self, f: F) -> Result<TxOutcome<T>>
    where
        F: FnOnce(TxScope) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        query::begin_transaction(&self.pool, self.config.log_sql, f).await
    }
}

#[async_trait]
impl DbAdapter for MySqlDb {
    fn driver_name(&self) -> &'static str { "MySQL" }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_version(&self) -> Result<String> {
        let row = sqlx::query("SELECT VERSION() as version").fetch_one(&self.pool).await?;
        Ok(row.try_get::<String, _>("version")?)
    }
}
