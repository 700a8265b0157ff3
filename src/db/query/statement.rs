use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::MySql;

use crate::models::SqlValue;

/// 一条渲染好的语句：带 `?` 占位符的 SQL 和按顺序对应的参数
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self { sql: sql.into(), params }
    }

    /// SQL 里 `?` 占位符的个数（跳过引号内的问号）
    pub fn placeholder_count(&self) -> usize {
        placeholders(&self.sql).len()
    }

    /// 把参数按字面量填进 SQL，仅用于日志展示
    pub fn interpolated(&self) -> String {
        let mut out = String::with_capacity(self.sql.len() + self.params.len() * 8);
        let mut last = 0;
        let mut params = self.params.iter();
        for pos in placeholders(&self.sql) {
            out.push_str(&self.sql[last..pos]);
            match params.next() {
                Some(v) => out.push_str(&v.to_sql_literal()),
                None => out.push('?'),
            }
            last = pos + 1;
        }
        out.push_str(&self.sql[last..]);
        out
    }

    pub(crate) fn bind(&self) -> Query<'_, MySql, MySqlArguments> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = match param {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::UInt(v) => query.bind(*v),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.as_str()),
                SqlValue::DateTime(v) => query.bind(*v),
            };
        }
        query
    }
}

/// 找出所有不在引号里的 `?` 的字节位置
fn placeholders(sql: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in sql.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '?' => out.push(i),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        let stmt = Statement::new("SELECT '?' AS q, `a?` FROM t WHERE id = ?", vec![SqlValue::Int(1)]);
        assert_eq!(stmt.placeholder_count(), 1);
        assert_eq!(stmt.interpolated(), "SELECT '?' AS q, `a?` FROM t WHERE id = 1");
    }

    #[test]
    fn interpolation_keeps_parameter_order() {
        let stmt = Statement::new(
            "UPDATE t SET name = ? WHERE id = ? AND note IS NULL",
            vec![SqlValue::from("o'neil"), SqlValue::from(3)],
        );
        assert_eq!(stmt.interpolated(), r"UPDATE t SET name = 'o\'neil' WHERE id = 3 AND note IS NULL");
    }
}
