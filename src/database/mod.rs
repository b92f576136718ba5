use std::{future::Future, time::Duration};

use eyre::Result;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    pool::PoolConnection,
    Error as SqlxError, MySql, MySqlPool,
};

use crate::{config::DatabaseConfig, model::Medal};

mod fetch;
mod store;

#[cfg(test)]
pub mod memory;

const MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct Database {
    mysql: MySqlPool,
}

impl Database {
    /// Creates the pool without opening a connection yet.
    ///
    /// Connections are established on first use so the service comes up
    /// even while the database is unreachable.
    pub fn new(config: &DatabaseConfig) -> Self {
        let mysql = Self::pool_options().connect_lazy_with(Self::connect_options(config));

        Self { mysql }
    }

    pub fn max_connections(&self) -> u32 {
        self.mysql.options().get_max_connections()
    }

    fn pool_options() -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(30))
    }

    fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
        let DatabaseConfig {
            host,
            port,
            user,
            password,
            database,
        } = config;

        let options = MySqlConnectOptions::new()
            .host(host)
            .port(*port)
            .username(user)
            .database(database);

        match password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    async fn acquire(&self) -> Result<PoolConnection<MySql>, SqlxError> {
        self.mysql.acquire().await
    }
}

/// Destination of a medal sync.
pub trait MedalStore: Send + Sync {
    /// Creates the medals table if needed.
    fn ensure_schema(&self) -> impl Future<Output = Result<()>> + Send;

    /// Inserts the medal or overwrites the row with the same medal id.
    fn replace_medal(&self, medal: &Medal) -> impl Future<Output = Result<()>> + Send;

    /// Deletes all medals whose id is not contained in `keep` and returns how
    /// many were deleted.
    fn prune_medals(&self, keep: &[i32]) -> impl Future<Output = Result<u64>> + Send;
}

/// Read access to stored medals.
pub trait MedalReader: Send + Sync {
    /// All stored medals, ordered by their id.
    fn fetch_medals(&self) -> impl Future<Output = Result<Vec<Medal>>> + Send;

    fn fetch_medal(&self, medal_id: i32) -> impl Future<Output = Result<Option<Medal>>> + Send;
}
