use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::models::TxOutcome;

use super::executor::{Executor, SharedTx};
use super::table::SqlTable;

/// 事务的提交和回滚
#[async_trait]
pub trait TxControl: Send {
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
}

#[async_trait]
impl TxControl for SharedTx {
    async fn commit(&mut self) -> Result<()> {
        let tx = self.lock().await.take().ok_or_else(|| anyhow!("事务已结束"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self.lock().await.take().ok_or_else(|| anyhow!("事务已结束"))?;
        tx.rollback().await?;
        Ok(())
    }
}

/// 事务回调拿到的作用域，从它创建的表都绑定在同一条连接上
#[derive(Clone)]
pub struct TxScope {
    executor: Executor,
    log_sql: bool,
}

impl TxScope {
    pub fn table(&self, name: &str) -> SqlTable {
        SqlTable::new(name, self.executor.clone(), self.log_sql)
    }
}

/// 回调返回 `Ok` 时提交，返回 `Err` 时回滚并把原因放进 `TxOutcome::RolledBack`。
/// 外层的 `Err` 只表示提交本身失败。
pub async fn run<C, T, Fut>(mut control: C, body: Fut) -> Result<TxOutcome<T>>
where
    C: TxControl,
    Fut: Future<Output = Result<T>>,
{
    match body.await {
        Ok(value) => {
            control.commit().await?;
            Ok(TxOutcome::Committed(value))
        }
        Err(cause) => {
            warn!("事务回滚: {:#}", cause);
            if let Err(e) = control.rollback().await {
                error!("事务回滚失败: {:#}", e);
            }
            Ok(TxOutcome::RolledBack(cause))
        }
    }
}

/// 从连接池取出一条连接开启事务。连接在事务结束（或 `Transaction` 被丢弃）时归还。
pub(crate) async fn begin<T, F, Fut>(pool: &MySqlPool, log_sql: bool, f: F) -> Result<TxOutcome<T>>
where
    F: FnOnce(TxScope) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let tx = pool.begin().await?;
    let shared: SharedTx = Arc::new(Mutex::new(Some(tx)));
    let scope = TxScope { executor: Executor::Tx(shared.clone()), log_sql };
    run(shared, f(scope)).await
}
