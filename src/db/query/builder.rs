use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use crate::models::SqlValue;
use crate::utils;

use super::clause::{Cmp, Conj, JoinKind, Limit, Lock, Sort};
use super::statement::Statement;
use super::table::SqlTable;

pub(crate) type Record = Map<String, Value>;

/// 新增选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOptions {
    /// 自动写入创建/更新时间，默认关闭
    pub auto_time: bool,
    pub create_time: String,
    pub update_time: String,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self { auto_time: false, create_time: "create_time".into(), update_time: "update_time".into() }
    }
}

impl InsertOptions {
    pub fn auto_time() -> Self {
        Self { auto_time: true, ..Self::default() }
    }

    pub fn columns(mut self, create_time: impl Into<String>, update_time: impl Into<String>) -> Self {
        self.create_time = create_time.into();
        self.update_time = update_time.into();
        self
    }
}

/// 更新选项，`incr`/`decr` 共用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    pub auto_time: bool,
    pub update_time: String,
    /// 全量更新保护，默认开启：没有条件时拒绝执行
    pub all_protect: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self { auto_time: false, update_time: "update_time".into(), all_protect: true }
    }
}

impl UpdateOptions {
    pub fn auto_time() -> Self {
        Self { auto_time: true, ..Self::default() }
    }

    pub fn update_time(mut self, column: impl Into<String>) -> Self {
        self.update_time = column.into();
        self
    }

    /// 关闭全量更新保护
    pub fn allow_all(mut self) -> Self {
        self.all_protect = false;
        self
    }
}

/// 删除选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOptions {
    /// 软删除，默认开启：只写入删除时间
    pub soft: bool,
    pub delete_time: String,
    /// 删除保护，默认开启：没有条件时拒绝执行
    pub protect: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self { soft: true, delete_time: "delete_time".into(), protect: true }
    }
}

impl DeleteOptions {
    /// 物理删除
    pub fn physical() -> Self {
        Self { soft: false, ..Self::default() }
    }

    pub fn delete_time(mut self, column: impl Into<String>) -> Self {
        self.delete_time = column.into();
        self
    }

    pub fn allow_all(mut self) -> Self {
        self.protect = false;
        self
    }
}

/// 一次查询的构造器。
///
/// 每个链式调用都消费自身并返回新值，终结操作（`select`、`update` 等）同样消费
/// 构造器，所以一条查询的条件不会残留到下一条查询里。
#[derive(Clone)]
pub struct QueryBuilder {
    pub(crate) table: SqlTable,
    fields: String,
    predicate: String,
    params: Vec<SqlValue>,
    joins: Vec<String>,
    groups: Vec<String>,
    orders: Vec<String>,
    limit: Option<Limit>,
    lock: Option<Lock>,
    pub(crate) show_sql: bool,
}

impl QueryBuilder {
    pub(crate) fn new(table: SqlTable) -> Self {
        Self {
            table,
            fields: "*".to_string(),
            predicate: String::new(),
            params: Vec::new(),
            joins: Vec::new(),
            groups: Vec::new(),
            orders: Vec::new(),
            limit: None,
            lock: None,
            show_sql: false,
        }
    }

    fn push_predicate(&mut self, conj: Conj, fragment: String) {
        if !self.predicate.is_empty() {
            self.predicate.push(' ');
            self.predicate.push_str(conj.as_str());
            self.predicate.push(' ');
        }
        self.predicate.push_str(&fragment);
    }

    fn compare(mut self, conj: Conj, field: &str, cmp: Cmp, value: SqlValue) -> Self {
        self.push_predicate(conj, format!("{} {} ?", field, cmp));
        self.params.push(value);
        self
    }

    /// 单条件查询；已有条件时以 AND 连接
    pub fn where_(self, field: &str, cmp: Cmp, value: impl Into<SqlValue>) -> Self {
        self.compare(Conj::And, field, cmp, value.into())
    }

    pub fn where_eq(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(Conj::And, field, Cmp::Eq, value.into())
    }

    pub fn and_where(self, field: &str, cmp: Cmp, value: impl Into<SqlValue>) -> Self {
        self.compare(Conj::And, field, cmp, value.into())
    }

    pub fn or_where(self, field: &str, cmp: Cmp, value: impl Into<SqlValue>) -> Self {
        self.compare(Conj::Or, field, cmp, value.into())
    }

    /// `field IN (?, ?, …)`，空集合渲染为 `IN (NULL)`
    pub fn where_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        let marks = if values.is_empty() {
            "NULL".to_string()
        } else {
            vec!["?"; values.len()].join(", ")
        };
        self.push_predicate(Conj::And, format!("{} IN ({})", field, marks));
        self.params.extend(values);
        self
    }

    /// 模糊匹配，通配符由调用方带上：`%` 任意个字符，`_` 单个字符
    pub fn where_like(mut self, field: &str, pattern: impl Into<SqlValue>) -> Self {
        self.push_predicate(Conj::And, format!("{} LIKE ?", field));
        self.params.push(pattern.into());
        self
    }

    pub fn where_between(mut self, field: &str, low: impl Into<SqlValue>, high: impl Into<SqlValue>) -> Self {
        self.push_predicate(Conj::And, format!("{} BETWEEN ? AND ?", field));
        self.params.push(low.into());
        self.params.push(high.into());
        self
    }

    pub fn where_null(mut self, field: &str) -> Self {
        self.push_predicate(Conj::And, format!("{} IS NULL", field));
        self
    }

    pub fn where_not_null(mut self, field: &str) -> Self {
        self.push_predicate(Conj::And, format!("{} IS NOT NULL", field));
        self
    }

    pub fn order(mut self, field: &str, sort: Sort) -> Self {
        self.orders.push(format!("{} {}", field, sort));
        self
    }

    pub fn group(mut self, field: &str) -> Self {
        self.groups.push(field.to_string());
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(Limit { offset: None, count });
        self
    }

    /// 分页，`current` 从 1 开始
    pub fn page(mut self, current: u64, size: u64) -> Self {
        let offset = current.max(1).saturating_sub(1).saturating_mul(size);
        self.limit = Some(Limit { offset: Some(offset), count: size });
        self
    }

    /// 要查询的字段，逗号分隔，如 `id, name, age`
    pub fn field(mut self, fields: &str) -> Self {
        self.fields = fields.to_string();
        self
    }

    pub fn field_distinct(mut self, fields: &str) -> Self {
        self.fields = format!("DISTINCT {}", fields);
        self
    }

    pub fn join(mut self, table: &str, on: &str, kind: JoinKind) -> Self {
        self.joins.push(format!("{} JOIN {} ON {}", kind, table, on));
        self
    }

    pub fn lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// 执行时打印最终 SQL
    pub fn show_sql(mut self) -> Self {
        self.show_sql = true;
        self
    }

    pub fn has_predicate(&self) -> bool {
        !self.predicate.is_empty()
    }

    fn push_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
    }

    /// 多表 UPDATE/DELETE 不支持 ORDER BY 和 LIMIT
    fn push_mutation_limit(&self, sql: &mut String) {
        if self.joins.is_empty() {
            self.push_order_limit(sql, self.limit.map(|l| Limit { offset: None, count: l.count }));
        }
    }

    fn push_where(&self, sql: &mut String) {
        if self.has_predicate() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate);
        }
    }

    fn push_group(&self, sql: &mut String) {
        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.groups.join(", "));
        }
    }

    fn push_order_limit(&self, sql: &mut String, limit: Option<Limit>) {
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some(limit) = limit {
            sql.push(' ');
            sql.push_str(&limit.to_string());
        }
    }

    fn push_lock(&self, sql: &mut String) {
        if let Some(lock) = self.lock {
            sql.push(' ');
            sql.push_str(&lock.to_string());
        }
    }

    fn select_with_limit(&self, fields: &str, limit: Option<Limit>) -> Statement {
        let mut sql = format!("SELECT {} FROM {}", fields, self.table.name());
        self.push_joins(&mut sql);
        self.push_where(&mut sql);
        self.push_group(&mut sql);
        self.push_order_limit(&mut sql, limit);
        self.push_lock(&mut sql);
        Statement::new(sql, self.params.clone())
    }

    pub fn to_select(&self) -> Statement {
        self.select_with_limit(&self.fields, self.limit)
    }

    pub fn to_find_one(&self) -> Statement {
        let offset = self.limit.and_then(|l| l.offset);
        self.select_with_limit(&self.fields, Some(Limit { offset, count: 1 }))
    }

    pub fn to_count(&self) -> Statement {
        let mut sql = format!("SELECT COUNT(*) AS COUNT FROM {}", self.table.name());
        self.push_joins(&mut sql);
        self.push_where(&mut sql);
        self.push_group(&mut sql);
        self.push_lock(&mut sql);
        Statement::new(sql, self.params.clone())
    }

    /// `INSERT`，空记录返回 `None`
    pub fn to_insert(&self, record: &Value, opts: &InsertOptions) -> Result<Option<Statement>> {
        let record = as_record(record)?;
        if record.is_empty() {
            return Ok(None);
        }
        let mut columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let mut params: Vec<SqlValue> = record.values().map(SqlValue::from).collect();
        if opts.auto_time {
            let now = utils::now();
            columns.push(&opts.create_time);
            columns.push(&opts.update_time);
            params.push(now.into());
            params.push(now.into());
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.name(),
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        );
        Ok(Some(Statement::new(sql, params)))
    }

    /// 批量 `INSERT`，列以第一条记录为准，其余记录缺失的列写入 NULL
    pub fn to_insert_all(&self, records: &[Value], opts: &InsertOptions) -> Result<Option<Statement>> {
        let Some(first) = records.first() else { return Ok(None) };
        let keys: Vec<String> = as_record(first)?.keys().cloned().collect();
        if keys.is_empty() {
            return Ok(None);
        }
        let width = keys.len() + if opts.auto_time { 2 } else { 0 };
        let row_marks = format!("({})", vec!["?"; width].join(", "));
        let mut params = Vec::with_capacity(width * records.len());
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let record = as_record(record)?;
            params.extend(keys.iter().map(|k| record.get(k).map(SqlValue::from).unwrap_or(SqlValue::Null)));
            if opts.auto_time {
                let now = utils::now();
                params.push(now.into());
                params.push(now.into());
            }
            rows.push(row_marks.as_str());
        }
        let mut columns = keys.join(", ");
        if opts.auto_time {
            columns.push_str(&format!(", {}, {}", opts.create_time, opts.update_time));
        }
        let sql = format!("INSERT INTO {} ({}) VALUES {}", self.table.name(), columns, rows.join(", "));
        Ok(Some(Statement::new(sql, params)))
    }

    fn update_with(&self, mut set: Vec<String>, mut params: Vec<SqlValue>, auto_time: bool, update_time: &str) -> Statement {
        if auto_time {
            set.push(format!("{} = ?", update_time));
            params.push(utils::now().into());
        }
        let mut sql = format!("UPDATE {}", self.table.name());
        self.push_joins(&mut sql);
        sql.push_str(" SET ");
        sql.push_str(&set.join(", "));
        self.push_where(&mut sql);
        self.push_mutation_limit(&mut sql);
        // SET 的参数在条件参数之前
        params.extend(self.params.iter().cloned());
        Statement::new(sql, params)
    }

    /// `UPDATE`，空记录返回 `None`
    pub fn to_update(&self, record: &Value, opts: &UpdateOptions) -> Result<Option<Statement>> {
        let record = as_record(record)?;
        if record.is_empty() {
            return Ok(None);
        }
        let set = record.keys().map(|k| format!("{} = ?", k)).collect();
        let params = record.values().map(SqlValue::from).collect();
        Ok(Some(self.update_with(set, params, opts.auto_time, &opts.update_time)))
    }

    /// `field = field + n`，`n` 为负数时即递减
    pub fn to_step(&self, field: &str, op: char, n: SqlValue, opts: &UpdateOptions) -> Statement {
        self.update_with(vec![format!("{0} = {0} {1} ?", field, op)], vec![n], opts.auto_time, &opts.update_time)
    }

    pub fn to_delete(&self, opts: &DeleteOptions) -> Statement {
        if opts.soft {
            return self.update_with(
                vec![format!("{} = ?", opts.delete_time)],
                vec![utils::now().into()],
                false,
                "",
            );
        }
        let name = self.table.name();
        let mut sql = if self.joins.is_empty() {
            format!("DELETE FROM {}", name)
        } else {
            // 多表删除只删主表的行，有别名时用别名
            let target = name.split_whitespace().last().unwrap_or(name);
            format!("DELETE {} FROM {}", target, name)
        };
        self.push_joins(&mut sql);
        self.push_where(&mut sql);
        self.push_mutation_limit(&mut sql);
        Statement::new(sql, self.params.clone())
    }
}

fn as_record(value: &Value) -> Result<&Record> {
    value.as_object().ok_or_else(|| anyhow!("记录必须是 JSON 对象，实际为: {}", value))
}
