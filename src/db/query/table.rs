use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{debug, info, warn};

use crate::models::{ExecResult, SqlValue, TxOutcome};

use super::builder::{DeleteOptions, InsertOptions, QueryBuilder, UpdateOptions};
use super::executor::Executor;
use super::row::row_to_json;
use super::statement::Statement;
use super::transaction::{self, TxScope};

struct TableInner {
    name: String,
    executor: Executor,
    log_sql: bool,
    // 最后执行的 SQL
    last_sql: Mutex<Option<String>>,
}

/// 一张表的访问入口。克隆代价很低，克隆出来的实例共享 `last_sql`。
#[derive(Clone)]
pub struct SqlTable {
    inner: Arc<TableInner>,
}

impl SqlTable {
    pub(crate) fn new(name: impl Into<String>, executor: Executor, log_sql: bool) -> Self {
        Self {
            inner: Arc::new(TableInner {
                name: name.into(),
                executor,
                log_sql,
                last_sql: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// 开始一条新查询
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.clone())
    }

    pub fn last_sql(&self) -> Option<String> {
        self.inner.last_sql.lock().ok().and_then(|g| g.clone())
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.executor.in_transaction()
    }

    fn trace(&self, stmt: &Statement, show_sql: bool) {
        let sql = stmt.interpolated();
        if show_sql || self.inner.log_sql {
            info!("SQL: {}", sql);
        } else {
            debug!(table = %self.inner.name, "SQL: {}", sql);
        }
        if let Ok(mut last) = self.inner.last_sql.lock() {
            *last = Some(sql);
        }
    }

    pub(crate) async fn fetch(&self, stmt: Statement, show_sql: bool) -> Result<Vec<Value>> {
        self.trace(&stmt, show_sql);
        let rows = self.inner.executor.fetch_all(&stmt).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub(crate) async fn exec(&self, stmt: Statement, show_sql: bool) -> Result<ExecResult> {
        self.trace(&stmt, show_sql);
        let result = self.inner.executor.execute(&stmt).await?;
        Ok(ExecResult::with_details(result.rows_affected(), result.last_insert_id()))
    }

    /// 自定义 SQL 查询，用 `?` 占位防止注入
    pub async fn query_raw(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Value>> {
        self.fetch(Statement::new(sql, params), false).await
    }

    /// 自定义 SQL 执行，返回影响行数
    pub async fn execute_raw(&self, sql: &str, params: Vec<SqlValue>) -> Result<ExecResult> {
        self.exec(Statement::new(sql, params), false).await
    }

    /// 在本表所在的连接池上开启事务，见 [`crate::db::MySqlDb::transaction`]
    pub async fn begin_transaction<T, F, Fut>(&self, f: F) -> Result<TxOutcome<T>>
    where
        F: FnOnce(TxScope) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.inner.executor {
            Executor::Pool(pool) => transaction::begin(pool, self.inner.log_sql, f).await,
            Executor::Tx(_) => Err(anyhow!("不支持嵌套事务")),
        }
    }
}

impl std::fmt::Debug for SqlTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlTable")
            .field("name", &self.inner.name)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

pub(crate) fn pooled(name: &str, pool: &MySqlPool, log_sql: bool) -> SqlTable {
    SqlTable::new(name, Executor::Pool(pool.clone()), log_sql)
}

fn to_value<T: Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

impl QueryBuilder {
    /// 没有条件且开启了保护时返回 false，并记录警告
    fn guard(&self, protect: bool, action: &str) -> bool {
        if protect && !self.has_predicate() {
            warn!(table = %self.table.name(), "是否忘记增加 WHERE 条件？如果需要{}全部数据，请关闭保护", action);
            return false;
        }
        true
    }

    /// 新增一条数据，空记录返回 `None`
    pub async fn insert<T: Serialize>(self, record: &T, opts: InsertOptions) -> Result<Option<ExecResult>> {
        match self.to_insert(&to_value(record)?, &opts)? {
            Some(stmt) => Ok(Some(self.table.exec(stmt, self.show_sql).await?)),
            None => Ok(None),
        }
    }

    /// 新增多条数据，所有记录的字段要保持一致
    pub async fn insert_all<T: Serialize>(self, records: &[T], opts: InsertOptions) -> Result<Option<ExecResult>> {
        let records = records.iter().map(to_value).collect::<Result<Vec<_>>>()?;
        match self.to_insert_all(&records, &opts)? {
            Some(stmt) => Ok(Some(self.table.exec(stmt, self.show_sql).await?)),
            None => Ok(None),
        }
    }

    /// 更新数据。没有条件且开启了全量更新保护时不执行，返回 `None`
    pub async fn update<T: Serialize>(self, record: &T, opts: UpdateOptions) -> Result<Option<ExecResult>> {
        let record = to_value(record)?;
        if !self.guard(opts.all_protect, "更新") {
            return Ok(None);
        }
        match self.to_update(&record, &opts)? {
            Some(stmt) => Ok(Some(self.table.exec(stmt, self.show_sql).await?)),
            None => Ok(None),
        }
    }

    /// 删除数据，默认软删除
    pub async fn delete(self, opts: DeleteOptions) -> Result<Option<ExecResult>> {
        if !self.guard(opts.protect, "删除") {
            return Ok(None);
        }
        let stmt = self.to_delete(&opts);
        Ok(Some(self.table.exec(stmt, self.show_sql).await?))
    }

    /// 以某个字段递增
    pub async fn incr(self, field: &str, n: impl Into<SqlValue>, opts: UpdateOptions) -> Result<Option<ExecResult>> {
        if !self.guard(opts.all_protect, "更新") {
            return Ok(None);
        }
        let stmt = self.to_step(field, '+', n.into(), &opts);
        Ok(Some(self.table.exec(stmt, self.show_sql).await?))
    }

    /// 以某个字段递减
    pub async fn decr(self, field: &str, n: impl Into<SqlValue>, opts: UpdateOptions) -> Result<Option<ExecResult>> {
        if !self.guard(opts.all_protect, "更新") {
            return Ok(None);
        }
        let stmt = self.to_step(field, '-', n.into(), &opts);
        Ok(Some(self.table.exec(stmt, self.show_sql).await?))
    }

    /// 查询多条数据
    pub async fn select(self) -> Result<Vec<Value>> {
        let stmt = self.to_select();
        self.table.fetch(stmt, self.show_sql).await
    }

    /// 查询一条数据
    pub async fn find_one(self) -> Result<Option<Value>> {
        let stmt = self.to_find_one();
        Ok(self.table.fetch(stmt, self.show_sql).await?.into_iter().next())
    }

    /// 查询数量
    pub async fn count(self) -> Result<i64> {
        let stmt = self.to_count();
        let rows = self.table.fetch(stmt, self.show_sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("COUNT"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}
