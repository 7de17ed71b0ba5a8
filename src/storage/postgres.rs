//! PostgreSQL record store
//!
//! Holds one `PgConnection` for the lifetime of a stage. Callers close it
//! explicitly with [`PgRecordStore::close`] once the stage body returns,
//! whether it succeeded or not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{checked_table_name, RecordStore};
use crate::config::defaults::INSERT_CHUNK_ROWS;
use crate::config::DatabaseConfig;
use crate::error::PipelineError;
use crate::types::{Correction, Record, StoredRecord};

/// PostgreSQL-backed record store
pub struct PgRecordStore {
    conn: PgConnection,
}

impl PgRecordStore {
    /// Open a connection from config. `DATABASE_URL` wins over the
    /// individual fields when present.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PipelineError> {
        let options = match &config.url {
            Some(url) => PgConnectOptions::from_str(url)?,
            None => {
                let mut opts = PgConnectOptions::new()
                    .host(&config.host)
                    .port(config.port)
                    .username(&config.user)
                    .database(&config.dbname);
                if let Some(password) = &config.password {
                    opts = opts.password(password);
                }
                opts
            }
        };

        let conn = PgConnection::connect_with(&options).await?;
        info!(host = %config.host, dbname = %config.dbname, "Connected to PostgreSQL");
        Ok(Self { conn })
    }

    /// Create `table` if it does not exist yet.
    pub async fn ensure_table(&mut self, table: &str) -> Result<(), PipelineError> {
        let table = checked_table_name(table)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                predicted_demand DOUBLE PRECISION NOT NULL,
                refund_amount DOUBLE PRECISION NOT NULL,
                actual_revenue DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        );
        sqlx::query(&ddl).execute(&mut self.conn).await?;
        debug!(table, "Ensured destination table");
        Ok(())
    }

    /// Close the connection. Errors are logged; the connection is released
    /// either way.
    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Error closing PostgreSQL connection");
        } else {
            debug!("PostgreSQL connection closed");
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn append(&mut self, table: &str, records: &[Record]) -> Result<Vec<i64>, PipelineError> {
        let table = checked_table_name(table)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.conn.begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {table} (predicted_demand, refund_amount, actual_revenue, created_at) "
            ));
            builder.push_values(chunk, |mut row, r| {
                row.push_bind(r.predicted_demand)
                    .push_bind(r.refund_amount)
                    .push_bind(r.actual_revenue)
                    .push_bind(r.created_at);
            });
            builder.push(" RETURNING id");

            let chunk_ids: Vec<i64> = builder
                .build_query_scalar()
                .fetch_all(&mut *tx)
                .await?;
            ids.extend(chunk_ids);
        }

        tx.commit().await?;
        debug!(table, rows = ids.len(), "Inserted records");
        Ok(ids)
    }

    async fn fetch_all(&mut self, table: &str) -> Result<Vec<StoredRecord>, PipelineError> {
        let table = checked_table_name(table)?;
        let rows: Vec<(i64, f64, f64, f64, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT id, predicted_demand, refund_amount, actual_revenue, created_at \
             FROM {table} ORDER BY id"
        ))
        .fetch_all(&mut self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, predicted_demand, refund_amount, actual_revenue, created_at)| {
                StoredRecord::new(
                    id,
                    Record {
                        predicted_demand,
                        refund_amount,
                        actual_revenue,
                        created_at,
                    },
                )
            })
            .collect())
    }

    async fn apply_corrections(
        &mut self,
        table: &str,
        corrections: &[Correction],
    ) -> Result<usize, PipelineError> {
        let table = checked_table_name(table)?;
        if corrections.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE {table} SET actual_revenue = $1 WHERE id = $2");
        let mut tx = self.conn.begin().await?;

        for c in corrections {
            let result = sqlx::query(&sql)
                .bind(c.corrected)
                .bind(c.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| PipelineError::Correction {
                    id: c.id,
                    message: e.to_string(),
                })?;
            if result.rows_affected() == 0 {
                // Dropping `tx` rolls back the updates issued so far.
                return Err(PipelineError::Correction {
                    id: c.id,
                    message: "no row with this id".to_string(),
                });
            }
        }

        tx.commit().await.map_err(|e| PipelineError::Correction {
            id: corrections.last().map_or(0, |c| c.id),
            message: format!("commit failed: {e}"),
        })?;
        Ok(corrections.len())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
