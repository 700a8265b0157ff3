//! 各数据源的连接配置。
//!
//! 每个配置都带有逐字段的默认值，反序列化（`serde(default)`）和 `new` 构造函数
//! 走的是同一套默认值。

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_CONNECTION_LIMIT: u32 = 2;
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_MONGO_PORT: u16 = 27017;
pub const DEFAULT_ES_PORT: u16 = 9200;

fn default_host() -> String {
    "localhost".to_string()
}
fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}
fn default_connection_limit() -> u32 {
    DEFAULT_CONNECTION_LIMIT
}
fn default_redis_port() -> u16 {
    DEFAULT_REDIS_PORT
}
fn default_mongo_port() -> u16 {
    DEFAULT_MONGO_PORT
}
fn default_es_port() -> u16 {
    DEFAULT_ES_PORT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Mysql,
    Redis,
    Mongodb,
    Elasticsearch,
}

impl Driver {
    pub fn default_port(&self) -> u16 {
        match self {
            Driver::Mysql => DEFAULT_MYSQL_PORT,
            Driver::Redis => DEFAULT_REDIS_PORT,
            Driver::Mongodb => DEFAULT_MONGO_PORT,
            Driver::Elasticsearch => DEFAULT_ES_PORT,
        }
    }
}

/// MySQL 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MySqlConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// 连接池大小
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    /// 是否打印每条执行的 SQL
    #[serde(default)]
    pub log_sql: bool,
}

impl MySqlConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            log_sql: false,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connection_limit(mut self, limit: u32) -> Self {
        // 连接池至少要有一个连接
        self.connection_limit = limit.max(1);
        self
    }

    pub fn log_sql(mut self, on: bool) -> Self {
        self.log_sql = on;
        self
    }

    pub fn get_dsn(&self) -> Result<String> {
        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, self.port))?;
        url.set_username(&self.user)
            .map_err(|_| anyhow!("无效的 MySQL 用户名"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow!("无效的 MySQL 密码"))?;
        }
        url.set_path(&self.database);
        url.query_pairs_mut()
            .append_pair("charset", "utf8mb4")
            .append_pair("collation", "utf8mb4_unicode_ci");
        Ok(url.to_string())
    }
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self::new(default_host(), "root", "", "")
    }
}

/// Redis 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// 数据库序号
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), port: DEFAULT_REDIS_PORT, db: 0, password: None }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = if password.is_empty() { None } else { Some(password) };
        self
    }

    pub fn get_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))?;
        if let Some(password) = self.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| anyhow!("无效的 Redis 密码"))?;
        }
        Ok(url.to_string())
    }

    /// 过期事件所在的频道
    pub fn expired_channel(&self) -> String {
        format!("__keyevent@{}__:expired", self.db)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new(default_host())
    }
}

/// MongoDB 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mongo_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
}

impl MongoConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MONGO_PORT,
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn get_uri(&self) -> Result<String> {
        let mut url = Url::parse(&format!("mongodb://{}:{}", self.host, self.port))?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| anyhow!("无效的 MongoDB 用户名"))?;
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow!("无效的 MongoDB 密码"))?;
        }
        url.set_path(&self.database);
        Ok(url.to_string())
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::new(default_host(), "", "", "test")
    }
}

/// Elasticsearch 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_es_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl EsConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), port: DEFAULT_ES_PORT, user: None, password: None }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn get_node(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.port))?)
    }
}

impl Default for EsConfig {
    fn default() -> Self {
        Self::new(default_host())
    }
}

/// 按驱动区分的配置，供 `new_adapter` 使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum AdapterConfig {
    Mysql(MySqlConfig),
    Redis(RedisConfig),
    Mongodb(MongoConfig),
    Elasticsearch(EsConfig),
}

impl AdapterConfig {
    pub fn driver(&self) -> Driver {
        match self {
            AdapterConfig::Mysql(_) => Driver::Mysql,
            AdapterConfig::Redis(_) => Driver::Redis,
            AdapterConfig::Mongodb(_) => Driver::Mongodb,
            AdapterConfig::Elasticsearch(_) => Driver::Elasticsearch,
        }
    }
}
