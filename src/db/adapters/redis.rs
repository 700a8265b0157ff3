use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RedisConfig;
use crate::db::adapter::DbAdapter;

/// 写入 Redis 的值：字符串原样写入，对象和数组序列化成 JSON
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Text(String),
    Json(Value),
}

impl KvValue {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(KvValue::Json(serde_json::to_value(value)?))
    }

    pub fn encode(&self) -> String {
        match self {
            KvValue::Text(s) => s.clone(),
            KvValue::Json(v) => encode_json(v),
        }
    }
}

fn encode_json(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for KvValue {
    fn from(v: &str) -> Self { KvValue::Text(v.to_string()) }
}

impl From<String> for KvValue {
    fn from(v: String) -> Self { KvValue::Text(v) }
}

impl From<Value> for KvValue {
    fn from(v: Value) -> Self { KvValue::Json(v) }
}

/// 把对象拍平成哈希的字段列表，空对象报错
fn hash_fields<T: Serialize>(fields: &T) -> Result<Vec<(String, String)>> {
    match serde_json::to_value(fields)? {
        Value::Object(map) if map.is_empty() => bail!("哈希至少需要一个字段"),
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, encode_json(&v))).collect()),
        other => Err(anyhow!("哈希值必须是对象，实际为: {}", other)),
    }
}

/// 过期秒数：不足一秒的部分向上取整，至少一秒，超出 i64 的按 i64::MAX
fn ttl_secs(ttl: Duration) -> i64 {
    let secs = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0)).max(1);
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Redis 访问入口，每个方法对应一条命令
#[derive(Clone)]
pub struct KvStore {
    client: redis::Client,
    conn: ConnectionManager,
    config: RedisConfig,
}

impl KvStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.get_url()?)?;
        let conn = client
            .get_connection_manager()
            .await
            .with_context(|| format!("无法连接 Redis {}:{}", config.host, config.port))?;
        info!(host = %config.host, port = config.port, db = config.db, "Connected to Redis");
        Ok(Self { client, conn, config: config.clone() })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    /// 设置值，`ttl` 为空时不过期
    pub async fn set(&self, key: &str, value: impl Into<KvValue>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let value = value.into().encode();
        let _: () = match ttl {
            // 值和过期时间在同一条命令里写入
            Some(ttl) => conn.set_ex(key, value, ttl_secs(ttl).unsigned_abs()).await?,
            None => conn.set(key, value).await?,
        };
        Ok(())
    }

    /// 删除，返回实际删除的键数
    pub async fn del(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.del(key).await?)
    }

    /// 以哈希方式存储一个对象
    pub async fn hset<T: Serialize>(&self, index: &str, fields: &T, ttl: Option<Duration>) -> Result<()> {
        self.hset_fields(index, hash_fields(fields)?, ttl).await
    }

    async fn hset_fields(&self, index: &str, fields: Vec<(String, String)>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().hset_multiple(index, fields.as_slice()).ignore();
        if let Some(ttl) = ttl {
            pipe.expire(index, ttl_secs(ttl)).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn hget(&self, index: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(index, field).await?)
    }

    pub async fn hgetall(&self, index: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall(index).await?)
    }

    pub async fn hdel(&self, index: &str, field: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.hdel(index, field).await?)
    }

    /// 递增，返回新值
    pub async fn incr_by(&self, key: &str, n: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, n).await?)
    }

    /// 递减，返回新值
    pub async fn decr_by(&self, key: &str, n: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.decr(key, n).await?)
    }

    /// 推入列表右端，返回列表长度
    pub async fn rpush(&self, key: &str, value: impl Into<KvValue>) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.rpush(key, value.into().encode()).await?)
    }

    /// 从列表右端弹出
    pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.rpop(key, None::<NonZeroUsize>).await?)
    }

    /// 订阅过期事件。先订阅再写入，保证不会错过事件。
    ///
    /// 会把服务端的 `notify-keyspace-events` 设为 `Ex`。
    pub async fn watch_expiry(&self, key: &str) -> Result<ExpiryWatch> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("Ex")
            .query_async(&mut conn)
            .await
            .context("开启过期通知失败")?;
        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = self.config.expired_channel();
        pubsub.subscribe(&channel).await?;
        debug!(%channel, key, "subscribed to expiry events");
        Ok(ExpiryWatch { pubsub, key: key.to_string() })
    }

    /// 设置带过期时间的值，过期后调用一次 `callback`
    pub async fn set_with_expiry_callback<F>(
        &self,
        key: &str,
        value: impl Into<KvValue>,
        ttl: Duration,
        callback: F,
    ) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let watch = self.watch_expiry(key).await?;
        self.set(key, value, Some(ttl)).await?;
        Ok(watch.spawn(callback))
    }

    /// 以哈希方式存储，过期后调用一次 `callback`
    pub async fn hset_with_expiry_callback<T, F>(
        &self,
        index: &str,
        fields: &T,
        ttl: Duration,
        callback: F,
    ) -> Result<JoinHandle<()>>
    where
        T: Serialize,
        F: FnOnce() + Send + 'static,
    {
        // 先校验字段再订阅
        let fields = hash_fields(fields)?;
        let watch = self.watch_expiry(index).await?;
        self.hset_fields(index, fields, Some(ttl)).await?;
        Ok(watch.spawn(callback))
    }
}

/// 针对单个键的过期订阅，只触发一次
pub struct ExpiryWatch {
    pubsub: PubSub,
    key: String,
}

impl ExpiryWatch {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 等到目标键的过期事件
    pub async fn wait(mut self) -> Result<()> {
        let mut messages = Box::pin(self.pubsub.on_message());
        while let Some(msg) = messages.next().await {
            let expired: String = msg.get_payload()?;
            if expired == self.key {
                return Ok(());
            }
        }
        Err(anyhow!("过期订阅连接已断开: {}", self.key))
    }

    pub fn spawn<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        tokio::spawn(async move {
            let key = self.key.clone();
            match self.wait().await {
                Ok(()) => callback(),
                Err(e) => warn!(%key, "过期回调未触发: {:#}", e),
            }
        })
    }
}

#[async_trait]
impl DbAdapter for KvStore {
    fn driver_name(&self) -> &'static str { "Redis" }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(anyhow!("Redis PING 返回异常: {}", pong));
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<String> {
        let mut conn = self.conn.clone();
        let info: String = redis::cmd("INFO").arg("server").query_async(&mut conn).await?;
        Ok(parse_version(&info).unwrap_or_default())
    }
}

fn parse_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix("redis_version:"))
        .map(|v| v.trim().to_string())
}
