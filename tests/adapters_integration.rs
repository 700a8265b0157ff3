//! Integration tests against live servers.
//!
//! Each test reads its server address from an environment variable and is
//! skipped when the variable is unset:
//! `UNIDB_MYSQL_URL`, `UNIDB_REDIS_URL`, `UNIDB_MONGO_URL`, `UNIDB_ES_URL`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use bson::doc;
use serde_json::json;
use unidb::query::{Cmp, DeleteOptions, InsertOptions, Sort, UpdateOptions};
use unidb::{
    DocStore, EsConfig, FieldKind, KvStore, MongoConfig, MySqlConfig, MySqlDb, RedisConfig, Schema,
    SearchIndex, TxOutcome,
};
use unidb::db::SchemaOptions;
use url::Url;

// =============================================================================
// Test Helpers
// =============================================================================

fn env_url(name: &str) -> Option<Url> {
    let raw = std::env::var(name).ok()?;
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => panic!("{} is not a valid url: {}", name, e),
    }
}

fn mysql_config() -> Option<MySqlConfig> {
    let url = env_url("UNIDB_MYSQL_URL")?;
    let user = if url.username().is_empty() { "root" } else { url.username() };
    Some(
        MySqlConfig::new(
            url.host_str().unwrap_or("localhost"),
            user,
            url.password().unwrap_or(""),
            url.path().trim_start_matches('/'),
        )
        .port(url.port().unwrap_or(3306))
        .log_sql(true),
    )
}

fn redis_config() -> Option<RedisConfig> {
    let url = env_url("UNIDB_REDIS_URL")?;
    let db = url.path().trim_start_matches('/').parse().unwrap_or(0);
    Some(
        RedisConfig::new(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(6379))
            .db(db)
            .password(url.password().unwrap_or("")),
    )
}

fn mongo_config() -> Option<MongoConfig> {
    let url = env_url("UNIDB_MONGO_URL")?;
    let database = match url.path().trim_start_matches('/') {
        "" => "unidb_test",
        db => db,
    };
    Some(
        MongoConfig::new(url.host_str().unwrap_or("localhost"), url.username(), url.password().unwrap_or(""), database)
            .port(url.port().unwrap_or(27017)),
    )
}

fn es_config() -> Option<EsConfig> {
    let url = env_url("UNIDB_ES_URL")?;
    let cfg = EsConfig::new(url.host_str().unwrap_or("localhost")).port(url.port().unwrap_or(9200));
    Some(match url.username() {
        "" => cfg,
        user => cfg.basic_auth(user, url.password().unwrap_or("")),
    })
}

macro_rules! require {
    ($cfg:expr) => {
        match $cfg {
            Some(cfg) => cfg,
            None => {
                eprintln!("skipped: server url not set");
                return;
            }
        }
    };
}

async fn fresh_members_table(db: &MySqlDb) -> unidb::query::SqlTable {
    let table = db.table("unidb_members");
    table.execute_raw("DROP TABLE IF EXISTS unidb_members", vec![]).await.unwrap();
    table
        .execute_raw(
            "CREATE TABLE unidb_members (
                id INT AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(64) NOT NULL,
                age INT NOT NULL DEFAULT 0,
                create_time DATETIME NULL,
                update_time DATETIME NULL,
                delete_time DATETIME NULL
            )",
            vec![],
        )
        .await
        .unwrap();
    table
}

// =============================================================================
// MySQL
// =============================================================================

#[tokio::test]
async fn test_mysql_crud_flow() {
    let cfg = require!(mysql_config());
    let db = MySqlDb::connect(&cfg).await.unwrap();
    let members = fresh_members_table(&db).await;

    let res = members
        .query()
        .insert(&json!({"age": 30, "name": "ann"}), InsertOptions::auto_time())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(res.rows_affected, 1);
    assert!(res.last_insert_id > 0);

    members
        .query()
        .insert_all(&[json!({"age": 20, "name": "bob"}), json!({"age": 40, "name": "cid"})], InsertOptions::default())
        .await
        .unwrap();
    assert_eq!(members.query().count().await.unwrap(), 3);

    let rows = members.query().where_("age", Cmp::Ge, 30).order("age", Sort::Asc).select().await.unwrap();
    let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap().to_string()).collect();
    assert_eq!(names, vec!["ann", "cid"]);

    let first = members.query().order("id", Sort::Asc).page(2, 1).find_one().await.unwrap().unwrap();
    assert_eq!(first["name"], "bob");

    members
        .query()
        .where_eq("name", "bob")
        .incr("age", 5, UpdateOptions::default())
        .await
        .unwrap();
    let bob = members.query().where_eq("name", "bob").find_one().await.unwrap().unwrap();
    assert_eq!(bob["age"], 25);

    // 无条件的更新和删除被拦截
    assert!(members.query().update(&json!({"age": 1}), UpdateOptions::default()).await.unwrap().is_none());
    assert!(members.query().delete(DeleteOptions::physical()).await.unwrap().is_none());

    members.query().where_eq("name", "cid").delete(DeleteOptions::default()).await.unwrap();
    let cid = members.query().where_eq("name", "cid").find_one().await.unwrap().unwrap();
    assert!(!cid["delete_time"].is_null());
    assert!(members.last_sql().unwrap().ends_with("LIMIT 1"));

    members.query().where_eq("name", "cid").delete(DeleteOptions::physical()).await.unwrap();
    assert_eq!(members.query().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_mysql_transaction_rolls_back_on_error() {
    let cfg = require!(mysql_config());
    let db = MySqlDb::connect(&cfg).await.unwrap();
    let members = fresh_members_table(&db).await;

    let outcome: TxOutcome<()> = db
        .transaction(|tx| async move {
            let t = tx.table("unidb_members");
            t.query().insert(&json!({"age": 1, "name": "tmp"}), InsertOptions::default()).await?;
            Err(anyhow!("abort"))
        })
        .await
        .unwrap();
    assert!(!outcome.is_committed());
    assert_eq!(members.query().count().await.unwrap(), 0);

    let outcome = db
        .transaction(|tx| async move {
            let t = tx.table("unidb_members");
            t.query().insert(&json!({"age": 2, "name": "kept"}), InsertOptions::default()).await?;
            t.query().where_eq("name", "kept").lock(Default::default()).find_one().await
        })
        .await
        .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(members.query().count().await.unwrap(), 1);
}

// =============================================================================
// Redis
// =============================================================================

#[tokio::test]
async fn test_kv_round_trip() {
    let cfg = require!(redis_config());
    let kv = KvStore::connect(&cfg).await.unwrap();

    kv.set("unidb:greeting", "hello", None).await.unwrap();
    assert_eq!(kv.get("unidb:greeting").await.unwrap().as_deref(), Some("hello"));

    // 对象写入 JSON 文本，读出时不自动解码
    kv.set("unidb:profile", json!({"a": 1}), None).await.unwrap();
    assert_eq!(kv.get("unidb:profile").await.unwrap().as_deref(), Some(r#"{"a":1}"#));

    assert_eq!(kv.del("unidb:greeting").await.unwrap(), 1);
    assert_eq!(kv.get("unidb:greeting").await.unwrap(), None);

    kv.del("unidb:counter").await.unwrap();
    assert_eq!(kv.incr_by("unidb:counter", 3).await.unwrap(), 3);
    assert_eq!(kv.decr_by("unidb:counter", 1).await.unwrap(), 2);

    kv.hset("unidb:session", &json!({"name": "ann", "uid": 7}), None).await.unwrap();
    assert_eq!(kv.hget("unidb:session", "uid").await.unwrap().as_deref(), Some("7"));
    assert_eq!(kv.hgetall("unidb:session").await.unwrap().len(), 2);
    assert_eq!(kv.hdel("unidb:session", "uid").await.unwrap(), 1);
    assert!(kv.hset("unidb:empty", &json!({}), None).await.is_err());
    assert!(kv
        .hset_with_expiry_callback("unidb:empty", &json!({}), Duration::from_secs(1), || {})
        .await
        .is_err());

    kv.del("unidb:queue").await.unwrap();
    kv.rpush("unidb:queue", json!({"job": 1})).await.unwrap();
    assert_eq!(kv.rpush("unidb:queue", "second").await.unwrap(), 2);
    assert_eq!(kv.rpop("unidb:queue").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn test_kv_expiry_callback_fires_once() {
    let cfg = require!(redis_config());
    let kv = KvStore::connect(&cfg).await.unwrap();

    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();
    let handle = kv
        .set_with_expiry_callback("unidb:short", "v", Duration::from_secs(1), move || {
            flag.store(true, Ordering::SeqCst);
        })
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
    assert!(fired.load(Ordering::SeqCst));
}

// =============================================================================
// MongoDB
// =============================================================================

#[tokio::test]
async fn test_doc_model_flow() {
    let cfg = require!(mongo_config());
    let store = DocStore::connect(&cfg).await.unwrap();
    let model = store.model("gadget").schema(
        Schema::new().required("name", FieldKind::String).with_default("stock", FieldKind::Int, 0),
        SchemaOptions::auto_time(),
    );
    assert_eq!(model.name(), "Gadget");
    assert_eq!(model.collection_name(), "gadgets");
    while model.delete(doc! {}).await.unwrap() > 0 {}

    model.insert(&json!({"name": "lamp", "junk": true})).await.unwrap();
    assert!(model.insert(&json!({"stock": 1})).await.is_err());

    let docs = model.select(doc! {"name": "lamp"}, Some((1, 10))).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_i32("stock").unwrap(), 0);
    assert!(docs[0].get("junk").is_none());
    assert!(docs[0].get_datetime("create_time").is_ok());

    let summary = model.update(doc! {"name": "lamp"}, doc! {"stock": 5}).await.unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(model.count(doc! {"stock": 5}).await.unwrap(), 1);
    assert_eq!(model.delete(doc! {"name": "lamp"}).await.unwrap(), 1);
}

// =============================================================================
// Elasticsearch
// =============================================================================

#[tokio::test]
async fn test_search_index_flow() {
    let cfg = require!(es_config());
    let es = SearchIndex::connect(&cfg).unwrap();
    es.delete_index("unidb_articles").await.ok();
    es.create_index("unidb_articles", None).await.unwrap();

    es.add_document("unidb_articles", &json!({"title": "hello world"})).await.unwrap();
    es.refresh("unidb_articles").await.unwrap();

    let resp = es
        .search("unidb_articles", &json!({"query": {"match": {"title": "hello"}}}))
        .await
        .unwrap();
    assert_eq!(unidb::db::adapters::elasticsearch::total_hits(&resp), 1);
    assert_eq!(unidb::db::adapters::elasticsearch::hits(&resp), vec![json!({"title": "hello world"})]);

    es.delete_index("unidb_articles").await.unwrap();
}
