use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, Level};

mod cli;

use cli::{parse_filter, parse_scalar, Cli, Command, KvAction};
use unidb::db::adapters::elasticsearch::{hits, total_hits};
use unidb::db::SchemaOptions;
use unidb::{new_adapter, DocStore, KvStore, MySqlDb, Schema, SearchIndex};

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.command {
        Command::Ping { driver, conn } => {
            let adapter = new_adapter(&conn.adapter(driver)?).await?;
            adapter.ping().await?;
            let version = adapter.get_version().await?;
            println!("{} {}", adapter.driver_name(), version);
        }
        Command::Sql { conn, table, filters, fields, page, size, count, raw, params } => {
            let db = MySqlDb::connect(&conn.mysql()).await?;
            let table = db.table(&table);
            if let Some(sql) = raw {
                let params = params.iter().map(|p| parse_scalar(p)).collect();
                print_json(&Value::Array(table.query_raw(&sql, params).await?))?;
                return Ok(());
            }
            let mut query = table.query().field(&fields);
            for filter in &filters {
                let (field, cmp, value) = parse_filter(filter)?;
                query = query.where_(&field, cmp, value);
            }
            if count {
                println!("{}", query.count().await?);
            } else {
                if let Some(page) = page {
                    query = query.page(page, size);
                }
                print_json(&Value::Array(query.select().await?))?;
            }
        }
        Command::Kv { conn, action } => {
            let kv = KvStore::connect(&conn.redis()?).await?;
            run_kv(&kv, action).await?;
        }
        Command::Doc { conn, model, filter, page, size } => {
            let store = DocStore::connect(&conn.mongo()).await?;
            let model = store.model(&model).schema(Schema::new().strict(false), SchemaOptions::default());
            let filter: Value = serde_json::from_str(&filter)?;
            let filter = bson::to_document(&filter)?;
            let docs = model.select(filter, page.map(|p| (p, size))).await?;
            let docs = docs.into_iter().map(|d| bson::Bson::Document(d).into_relaxed_extjson()).collect();
            print_json(&Value::Array(docs))?;
        }
        Command::Search { conn, index, query } => {
            let es = SearchIndex::connect(&conn.es())?;
            let query: Value = serde_json::from_str(&query)?;
            let resp = es.search(&index, &query).await?;
            info!(total = total_hits(&resp), "search finished");
            print_json(&Value::Array(hits(&resp)))?;
        }
    }

    Ok(())
}

async fn run_kv(kv: &KvStore, action: KvAction) -> Result<()> {
    match action {
        KvAction::Get { key } => match kv.get(&key).await? {
            Some(v) => println!("{}", v),
            None => println!("(nil)"),
        },
        KvAction::Set { key, value, ttl } => {
            kv.set(&key, value, ttl.map(Duration::from_secs)).await?;
            println!("OK");
        }
        KvAction::Del { key } => println!("{}", kv.del(&key).await?),
        KvAction::Watch { key } => {
            let watch = kv.watch_expiry(&key).await?;
            let (tx, rx) = tokio::sync::oneshot::channel();
            let mut tx = Some(tx);
            ctrlc::set_handler(move || {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
            })?;
            info!(%key, "waiting for key to expire");
            tokio::select! {
                res = watch.wait() => {
                    res?;
                    println!("{} expired", key);
                }
                _ = rx => return Err(anyhow!("已取消")),
            }
        }
    }
    Ok(())
}
