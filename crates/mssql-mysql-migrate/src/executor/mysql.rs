//! MySQL statement runner.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts, TxOpts};
use tracing::{info, warn};

use super::StatementRunner;
use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};

/// A single MySQL connection executing one transaction per statement.
pub struct MysqlRunner {
    conn: Conn,
}

impl MysqlRunner {
    /// Connect using the target configuration.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to Preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            .init(vec![format!("SET NAMES {}", config.charset)]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let opts: Opts = builder.into();
        let context = format!(
            "connecting to MySQL at {}:{}/{}",
            config.host, config.port, config.database
        );
        let conn = Conn::new(opts)
            .await
            .map_err(|e| MigrateError::connection(e, context))?;

        info!(
            "Connected to MySQL target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { conn })
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl StatementRunner for MysqlRunner {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut tx = self.conn.start_transaction(TxOpts::default()).await?;
        match tx.query_drop(sql).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e.into())
            }
        }
    }
}
