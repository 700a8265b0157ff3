use std::sync::Arc;

use anyhow::{anyhow, Result};
use sqlx::mysql::{MySqlQueryResult, MySqlRow};
use sqlx::{MySql, MySqlPool, Transaction};
use tokio::sync::Mutex;

use super::statement::Statement;

/// 事务持有的连接；提交或回滚后变为 `None`
pub(crate) type SharedTx = Arc<Mutex<Option<Transaction<'static, MySql>>>>;

/// 语句在哪条连接上执行：连接池，或者某个事务独占的连接
#[derive(Clone)]
pub(crate) enum Executor {
    Pool(MySqlPool),
    Tx(SharedTx),
}

impl Executor {
    pub(crate) fn in_transaction(&self) -> bool {
        matches!(self, Executor::Tx(_))
    }

    pub(crate) async fn fetch_all(&self, stmt: &Statement) -> Result<Vec<MySqlRow>> {
        match self {
            Executor::Pool(pool) => Ok(stmt.bind().fetch_all(pool).await?),
            Executor::Tx(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(|| anyhow!("事务已结束"))?;
                Ok(stmt.bind().fetch_all(&mut **conn).await?)
            }
        }
    }

    pub(crate) async fn execute(&self, stmt: &Statement) -> Result<MySqlQueryResult> {
        match self {
            Executor::Pool(pool) => Ok(stmt.bind().execute(pool).await?),
            Executor::Tx(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(|| anyhow!("事务已结束"))?;
                Ok(stmt.bind().execute(&mut **conn).await?)
            }
        }
    }
}
