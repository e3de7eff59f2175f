//! Database connection management

use anyhow::Context;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::fmt;
use tokio_postgres::NoTls;

pub type DbPool = Pool;

/// `INSERT ... ON CONFLICT` used by the user upsert appeared in 9.5
pub const MIN_SERVER_VERSION: i32 = 90500;

/// Where the library tables live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DbTarget {
    fn pool_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.database.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(self.max_connections.max(1) as usize));
        cfg
    }
}

/// Password is never printed
impl fmt::Display for DbTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// What the pool actually connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub database: String,
    pub user: String,
    /// `server_version_num`, e.g. 160002 for 16.2
    pub version_num: i32,
}

impl ServerInfo {
    pub fn supports_library_schema(&self) -> bool {
        self.version_num >= MIN_SERVER_VERSION
    }
}

/// Create a lazily connecting PostgreSQL pool
pub fn create_pool(target: &DbTarget) -> anyhow::Result<DbPool> {
    target
        .pool_config()
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .with_context(|| format!("Failed to create PostgreSQL pool for {}", target))
}

/// Open one connection and check the server can host the library schema
pub async fn verify_server(pool: &DbPool) -> anyhow::Result<ServerInfo> {
    let client = pool
        .get()
        .await
        .context("Failed to connect to PostgreSQL")?;
    let row = client
        .query_one(
            "SELECT current_database(), current_user, current_setting('server_version_num')::int",
            &[],
        )
        .await?;

    let info = ServerInfo {
        database: row.get(0),
        user: row.get(1),
        version_num: row.get(2),
    };
    log::debug!(
        "Connected to database '{}' as '{}' (server {})",
        info.database,
        info.user,
        info.version_num
    );

    if !info.supports_library_schema() {
        anyhow::bail!(
            "PostgreSQL server version {} is older than the required {}",
            info.version_num,
            MIN_SERVER_VERSION
        );
    }
    Ok(info)
}
