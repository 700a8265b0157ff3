use anyhow::{Context, Result};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::info;

use crate::config::MySqlConfig;

/// 按配置建立连接池，每条新连接都设置 utf8mb4 字符集
pub async fn connect_pool(config: &MySqlConfig) -> Result<MySqlPool> {
    let dsn = config.get_dsn()?;
    let pool = MySqlPoolOptions::new()
        .max_connections(config.connection_limit.max(1))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("SET NAMES utf8mb4 COLLATE utf8mb4_unicode_ci")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&dsn)
        .await
        .with_context(|| format!("无法连接 MySQL {}:{}", config.host, config.port))?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        pool_size = config.connection_limit,
        "Connected to MySQL database"
    );
    Ok(pool)
}
