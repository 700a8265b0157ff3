//! Property-based tests for statement rendering.
//!
//! Whatever chain of builder calls produced it, every rendered statement
//! carries exactly one bound value per `?` placeholder, in order.

use std::sync::OnceLock;

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use sqlx::MySqlPool;
use tokio::runtime::{Builder, Runtime};
use unidb::query::{Cmp, DeleteOptions, InsertOptions, JoinKind, Lock, QueryBuilder, Sort, SqlTable, UpdateOptions};
use unidb::{MySqlConfig, MySqlDb, SqlValue};

// =============================================================================
// Helpers
// =============================================================================

/// A table on a pool that never connects; only rendering is exercised.
fn table() -> SqlTable {
    static RT: OnceLock<Runtime> = OnceLock::new();
    static TABLE: OnceLock<SqlTable> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            let rt = RT.get_or_init(|| Builder::new_current_thread().enable_all().build().unwrap());
            let _guard = rt.enter();
            let pool = MySqlPool::connect_lazy("mysql://root@127.0.0.1:1/unidb").unwrap();
            MySqlDb::from_pool(pool, MySqlConfig::default()).table("orders o")
        })
        .clone()
}

#[derive(Debug, Clone)]
enum Step {
    Where(String, Cmp, i64),
    And(String, Cmp, String),
    Or(String, Cmp, String),
    In(String, Vec<i64>),
    Like(String, String),
    Between(String, i64, i64),
    Null(String),
    NotNull(String),
    /// 第二个参数为真时 ON 条件里带一个引号内的 `?`
    Join(String, bool),
    Order(String),
    Group(String),
    Page(u64, u64),
    Limit(u64),
    Lock,
}

fn field() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

/// Bound text may contain quotes and question marks; it never reaches the SQL.
fn text() -> impl Strategy<Value = String> {
    "[a-z?' ]{0,8}"
}

fn cmp() -> impl Strategy<Value = Cmp> {
    prop_oneof![
        Just(Cmp::Eq),
        Just(Cmp::Ne),
        Just(Cmp::Gt),
        Just(Cmp::Lt),
        Just(Cmp::Ge),
        Just(Cmp::Le),
        Just(Cmp::NotEq),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (field(), cmp(), any::<i64>()).prop_map(|(f, c, v)| Step::Where(f, c, v)),
        (field(), cmp(), text()).prop_map(|(f, c, v)| Step::And(f, c, v)),
        (field(), cmp(), text()).prop_map(|(f, c, v)| Step::Or(f, c, v)),
        (field(), prop::collection::vec(any::<i64>(), 0..5)).prop_map(|(f, v)| Step::In(f, v)),
        (field(), text()).prop_map(|(f, p)| Step::Like(f, p)),
        (field(), any::<i64>(), any::<i64>()).prop_map(|(f, a, b)| Step::Between(f, a, b)),
        field().prop_map(Step::Null),
        field().prop_map(Step::NotNull),
        (field(), any::<bool>()).prop_map(|(f, q)| Step::Join(f, q)),
        field().prop_map(Step::Order),
        field().prop_map(Step::Group),
        (0..5u64, 1..50u64).prop_map(|(c, s)| Step::Page(c, s)),
        (1..100u64).prop_map(Step::Limit),
        Just(Step::Lock),
    ]
}

fn apply(q: QueryBuilder, step: Step) -> QueryBuilder {
    match step {
        Step::Where(f, c, v) => q.where_(&f, c, v),
        Step::And(f, c, v) => q.and_where(&f, c, v),
        Step::Or(f, c, v) => q.or_where(&f, c, v),
        Step::In(f, v) => q.where_in(&f, v),
        Step::Like(f, p) => q.where_like(&f, p),
        Step::Between(f, a, b) => q.where_between(&f, a, b),
        Step::Null(f) => q.where_null(&f),
        Step::NotNull(f) => q.where_not_null(&f),
        Step::Join(f, quoted) => {
            let on = if quoted { format!("u.{} = '?'", f) } else { format!("u.{} = o.id", f) };
            q.join("user u", &on, JoinKind::Left)
        }
        Step::Order(f) => q.order(&f, Sort::Asc),
        Step::Group(f) => q.group(&f),
        Step::Page(c, s) => q.page(c, s),
        Step::Limit(n) => q.limit(n),
        Step::Lock => q.lock(Lock::ForUpdate),
    }
}

fn record() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(field(), any::<i64>(), 1..5)
        .prop_map(|m| Value::Object(m.into_iter().map(|(k, v)| (k, json!(v))).collect::<Map<_, _>>()))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_render_binds_one_value_per_placeholder(
        steps in prop::collection::vec(step(), 0..12),
        row in record(),
        n in any::<i64>(),
    ) {
        let q = steps.into_iter().fold(table().query(), apply);
        let predicate = q.to_select().params;

        let update = q.to_update(&row, &UpdateOptions::auto_time()).unwrap().unwrap();
        let step = q.to_step("stock", '+', SqlValue::from(n), &UpdateOptions::default());
        let soft = q.to_delete(&DeleteOptions::default());

        // SET 的值在前，条件的值在后
        for stmt in [&update, &step, &soft] {
            prop_assert!(stmt.params.len() >= predicate.len());
            prop_assert_eq!(&stmt.params[stmt.params.len() - predicate.len()..], &predicate[..]);
        }
        prop_assert_eq!(&step.params[0], &SqlValue::from(n));

        let mut renders = vec![
            q.to_select(),
            q.to_find_one(),
            q.to_count(),
            q.to_delete(&DeleteOptions::physical()),
            update,
            step,
            soft,
        ];
        renders.extend(q.to_insert(&row, &InsertOptions::auto_time()).unwrap());
        for stmt in &renders {
            prop_assert_eq!(stmt.placeholder_count(), stmt.params.len(), "{}", stmt.sql);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn insert_all_adds_two_time_values_per_row(rows in prop::collection::vec(record(), 1..6)) {
        let columns = rows[0].as_object().unwrap().len();
        let stmt = table()
            .query()
            .to_insert_all(&rows, &InsertOptions::auto_time())
            .unwrap()
            .unwrap();
        prop_assert_eq!(stmt.params.len(), rows.len() * (columns + 2));
        prop_assert_eq!(stmt.placeholder_count(), stmt.params.len(), "{}", stmt.sql);
    }
}
