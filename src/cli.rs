use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};

use unidb::query::Cmp;
use unidb::{AdapterConfig, Driver, EsConfig, MongoConfig, MySqlConfig, RedisConfig, SqlValue};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 输出调试日志（包括执行的 SQL）
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// 连接参数，各驱动共用
#[derive(Args, Debug, Clone)]
pub struct ConnArgs {
    /// Host
    #[arg(short = 'H', long, default_value = "localhost")]
    pub host: String,

    /// Port, defaults to the driver's standard port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Username
    #[arg(short = 'u', long, default_value = "")]
    pub user: String,

    /// Password
    #[arg(short = 'p', long, default_value = "")]
    pub password: String,

    /// Database name (Redis: database index)
    #[arg(short = 'd', long)]
    pub database: Option<String>,
}

impl ConnArgs {
    fn port_or(&self, driver: Driver) -> u16 {
        self.port.unwrap_or_else(|| driver.default_port())
    }

    pub fn mysql(&self) -> MySqlConfig {
        let user = if self.user.is_empty() { "root" } else { self.user.as_str() };
        MySqlConfig::new(&self.host, user, &self.password, self.database.clone().unwrap_or_default())
            .port(self.port_or(Driver::Mysql))
    }

    pub fn redis(&self) -> Result<RedisConfig> {
        let db = match self.database.as_deref() {
            Some(d) => d.parse::<i64>().map_err(|_| anyhow!("Redis 数据库序号必须是整数: {}", d))?,
            None => 0,
        };
        Ok(RedisConfig::new(&self.host)
            .port(self.port_or(Driver::Redis))
            .db(db)
            .password(self.password.clone()))
    }

    pub fn mongo(&self) -> MongoConfig {
        MongoConfig::new(&self.host, &self.user, &self.password, self.database.clone().unwrap_or_else(|| "test".into()))
            .port(self.port_or(Driver::Mongodb))
    }

    pub fn es(&self) -> EsConfig {
        let cfg = EsConfig::new(&self.host).port(self.port_or(Driver::Elasticsearch));
        if self.user.is_empty() {
            cfg
        } else {
            cfg.basic_auth(&self.user, &self.password)
        }
    }

    pub fn adapter(&self, driver: Driver) -> Result<AdapterConfig> {
        Ok(match driver {
            Driver::Mysql => AdapterConfig::Mysql(self.mysql()),
            Driver::Redis => AdapterConfig::Redis(self.redis()?),
            Driver::Mongodb => AdapterConfig::Mongodb(self.mongo()),
            Driver::Elasticsearch => AdapterConfig::Elasticsearch(self.es()),
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check connectivity and print the server version
    Ping {
        #[arg(value_enum)]
        driver: Driver,
        #[command(flatten)]
        conn: ConnArgs,
    },
    /// Query a MySQL table
    Sql {
        #[command(flatten)]
        conn: ConnArgs,
        table: String,
        /// Condition such as `age>=18`, repeatable (joined with AND)
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,
        /// Columns to select, comma separated
        #[arg(short = 'f', long, default_value = "*")]
        fields: String,
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<u64>,
        #[arg(long, default_value = "10")]
        size: u64,
        /// Print the row count instead of rows
        #[arg(long)]
        count: bool,
        /// Raw SQL with `?` placeholders, ignores the builder options
        #[arg(long)]
        raw: Option<String>,
        /// Values bound to the raw SQL placeholders
        #[arg(requires = "raw")]
        params: Vec<String>,
    },
    /// Key-value operations on Redis
    Kv {
        #[command(flatten)]
        conn: ConnArgs,
        #[command(subcommand)]
        action: KvAction,
    },
    /// Find documents in a MongoDB model
    Doc {
        #[command(flatten)]
        conn: ConnArgs,
        model: String,
        /// Filter as JSON
        #[arg(long, default_value = "{}")]
        filter: String,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long, default_value = "10")]
        size: u64,
    },
    /// Run a search against an Elasticsearch index
    Search {
        #[command(flatten)]
        conn: ConnArgs,
        index: String,
        /// Query body as JSON
        #[arg(default_value = r#"{"query":{"match_all":{}}}"#)]
        query: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum KvAction {
    Get { key: String },
    Set {
        key: String,
        value: String,
        /// Expiry in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    Del { key: String },
    /// Block until the key expires (Ctrl-C to stop)
    Watch { key: String },
}

/// 解析 `field<op>value` 形式的条件
pub fn parse_filter(s: &str) -> Result<(String, Cmp, SqlValue)> {
    const OPS: [&str; 7] = ["<>", "!=", ">=", "<=", "=", ">", "<"];
    let (pos, op) = OPS
        .iter()
        .filter_map(|op| s.find(op).map(|pos| (pos, *op)))
        .min_by_key(|(pos, op)| (*pos, std::cmp::Reverse(op.len())))
        .ok_or_else(|| anyhow!("无法解析条件: {}", s))?;
    let field = s[..pos].trim();
    if field.is_empty() {
        return Err(anyhow!("条件缺少字段名: {}", s));
    }
    let raw = s[pos + op.len()..].trim();
    Ok((field.to_string(), op.parse()?, parse_scalar(raw)))
}

pub fn parse_scalar(raw: &str) -> SqlValue {
    if let Ok(i) = raw.parse::<i64>() {
        return SqlValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return SqlValue::Float(f);
    }
    if raw.eq_ignore_ascii_case("null") {
        return SqlValue::Null;
    }
    SqlValue::Text(raw.trim_matches('\'').to_string())
}
