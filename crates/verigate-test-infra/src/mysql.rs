use crate::{Result, TestInfraError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "verigate".to_string())]
    database: String,
    #[builder(default = "verigate".to_string())]
    username: String,
    #[builder(default = "verigate".to_string())]
    password: String,
    /// Connection attempts made while the server finishes starting.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    connect_backoff: Duration,
}

/// Disposable MySQL server holding gateway records.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    /// Starts a MySQL 8.4 container and waits for its ready message.
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", "8.4")
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// DSN for the mapped host port.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(3306).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    /// Opens a pool and applies `schema` in order.
    ///
    /// The ready message appears before the server accepts TCP clients, so
    /// connecting is retried within the configured attempt budget.
    pub async fn bootstrap(&self, schema: &[&str]) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let pool = self.connect_with_retry(&url).await?;
        for statement in schema {
            sqlx::query(*statement).execute(&pool).await?;
        }
        Ok(pool)
    }

    async fn connect_with_retry(&self, url: &str) -> Result<MySqlPool> {
        let mut attempt = 1;
        loop {
            match MySqlPoolOptions::new().max_connections(5).connect(url).await {
                Ok(pool) => return Ok(pool),
                Err(error) if attempt >= self.config.connect_attempts => {
                    return Err(TestInfraError::Database(error));
                }
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(self.config.connect_backoff).await;
                }
            }
        }
    }
}
