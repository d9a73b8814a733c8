//! Postgres-backed stock store.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | `StoreError` |
//! |------------|---------------|--------------|
//! | unique violation | `23505` | `Concurrency` (racing insert of the same SKU or version) |
//! | check / foreign key violation | `23514` / `23503` | `Rejected` |
//! | other database errors, pool timeouts, IO | any | `Unavailable` |
//!
//! ## Atomicity
//!
//! `commit()` runs a single transaction: a version-guarded `UPDATE` (or an
//! `INSERT … ON CONFLICT DO NOTHING` for new records) followed by the ledger
//! inserts. Zero affected rows on the guarded write means another writer got
//! there first and the transaction is rolled back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storefront_core::{AggregateRoot, ExpectedVersion, MovementId};
use storefront_inventory::{Direction, Sku, StockMovement, StockRecord, StockStatus};

use super::r#trait::{StockStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_stock.sql");

/// Postgres stock store (`stock_records` + `stock_movements`).
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool with bounded acquire time, so an unreachable database
    /// surfaces as `Unavailable` instead of hanging requests.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Apply the schema (idempotent).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        match db.code().as_deref() {
            Some("23505") => return StoreError::Concurrency(db.message().to_string()),
            Some("23514") | Some("23503") => return StoreError::Rejected(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn to_db(value: u64, column: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Rejected(format!("{column} exceeds BIGINT range")))
}

fn from_db(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Rejected(format!("negative {column} in storage")))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| StoreError::Rejected(format!("column {column}: {e}")))
}

fn record_from_row(row: &PgRow) -> Result<StockRecord, StoreError> {
    let sku: String = get(row, "sku")?;
    let sku = Sku::parse(&sku).map_err(|e| StoreError::Rejected(e.to_string()))?;
    Ok(StockRecord::restore(
        sku,
        from_db(get(row, "quantity_on_hand")?, "quantity_on_hand")?,
        from_db(get(row, "low_stock_threshold")?, "low_stock_threshold")?,
        get::<DateTime<Utc>>(row, "last_updated")?,
        from_db(get(row, "version")?, "version")?,
    ))
}

fn movement_from_row(row: &PgRow) -> Result<StockMovement, StoreError> {
    let rejected = |e: storefront_core::DomainError| StoreError::Rejected(e.to_string());
    let sku: String = get(row, "sku")?;
    let direction: String = get(row, "direction")?;
    let status_after: String = get(row, "status_after")?;

    Ok(StockMovement {
        movement_id: MovementId::from_uuid(get::<uuid::Uuid>(row, "movement_id")?),
        sku: Sku::parse(&sku).map_err(rejected)?,
        direction: direction.parse::<Direction>().map_err(rejected)?,
        quantity: from_db(get(row, "quantity")?, "quantity")?,
        quantity_before: from_db(get(row, "quantity_before")?, "quantity_before")?,
        quantity_after: from_db(get(row, "quantity_after")?, "quantity_after")?,
        status_after: status_after.parse::<StockStatus>().map_err(rejected)?,
        reason: get::<Option<String>>(row, "reason")?,
        occurred_at: get::<DateTime<Utc>>(row, "occurred_at")?,
        version: from_db(get(row, "version")?, "version")?,
    })
}

async fn write_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &StockRecord,
    expected: ExpectedVersion,
) -> Result<u64, StoreError> {
    let quantity = to_db(record.quantity_on_hand(), "quantity_on_hand")?;
    let threshold = to_db(record.low_stock_threshold(), "low_stock_threshold")?;
    let version = to_db(record.version(), "version")?;

    let result = match expected {
        ExpectedVersion::Exact(0) => {
            sqlx::query(
                r#"
                INSERT INTO stock_records
                    (sku, quantity_on_hand, low_stock_threshold, status, last_updated, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (sku) DO NOTHING
                "#,
            )
            .bind(record.sku().as_str())
            .bind(quantity)
            .bind(threshold)
            .bind(record.status().as_str())
            .bind(record.last_updated())
            .bind(version)
            .execute(&mut **tx)
            .await
        }
        ExpectedVersion::Exact(v) => {
            sqlx::query(
                r#"
                UPDATE stock_records
                SET quantity_on_hand = $2,
                    low_stock_threshold = $3,
                    status = $4,
                    last_updated = $5,
                    version = $6
                WHERE sku = $1 AND version = $7
                "#,
            )
            .bind(record.sku().as_str())
            .bind(quantity)
            .bind(threshold)
            .bind(record.status().as_str())
            .bind(record.last_updated())
            .bind(version)
            .bind(to_db(v, "expected version")?)
            .execute(&mut **tx)
            .await
        }
        ExpectedVersion::Any => {
            sqlx::query(
                r#"
                INSERT INTO stock_records
                    (sku, quantity_on_hand, low_stock_threshold, status, last_updated, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (sku) DO UPDATE SET
                    quantity_on_hand = EXCLUDED.quantity_on_hand,
                    low_stock_threshold = EXCLUDED.low_stock_threshold,
                    status = EXCLUDED.status,
                    last_updated = EXCLUDED.last_updated,
                    version = EXCLUDED.version
                "#,
            )
            .bind(record.sku().as_str())
            .bind(quantity)
            .bind(threshold)
            .bind(record.status().as_str())
            .bind(record.last_updated())
            .bind(version)
            .execute(&mut **tx)
            .await
        }
    };

    Ok(result.map_err(map_sqlx_error)?.rows_affected())
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    m: &StockMovement,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            movement_id, sku, direction, quantity, quantity_before, quantity_after,
            status_after, reason, occurred_at, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(*m.movement_id.as_uuid())
    .bind(m.sku.as_str())
    .bind(m.direction.as_str())
    .bind(to_db(m.quantity, "quantity")?)
    .bind(to_db(m.quantity_before, "quantity_before")?)
    .bind(to_db(m.quantity_after, "quantity_after")?)
    .bind(m.status_after.as_str())
    .bind(m.reason.as_deref())
    .bind(m.occurred_at)
    .bind(to_db(m.version, "version")?)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(skip_all, fields(sku = %sku))]
    async fn load(&self, sku: &Sku) -> Result<Option<StockRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT sku, quantity_on_hand, low_stock_threshold, last_updated, version
            FROM stock_records
            WHERE sku = $1
            "#,
        )
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<StockRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT sku, quantity_on_hand, low_stock_threshold, last_updated, version
            FROM stock_records
            ORDER BY sku
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip_all, fields(sku = %record.sku(), version = record.version()))]
    async fn commit(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
        movements: &[StockMovement],
    ) -> Result<(), StoreError> {
        if movements.iter().any(|m| &m.sku != record.sku()) {
            return Err(StoreError::Rejected("movement belongs to a different sku".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let affected = write_record(&mut tx, record, expected).await?;
        if affected == 0 {
            // Dropping `tx` rolls back.
            return Err(StoreError::Concurrency(format!(
                "stock record {} changed since {expected:?}",
                record.sku()
            )));
        }

        for m in movements {
            insert_movement(&mut tx, m).await?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip_all, fields(sku = %sku))]
    async fn movements(&self, sku: &Sku, limit: usize) -> Result<Vec<StockMovement>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT movement_id, sku, direction, quantity, quantity_before, quantity_after,
                   status_after, reason, occurred_at, version
            FROM stock_movements
            WHERE sku = $1
            ORDER BY version DESC
            LIMIT $2
            "#,
        )
        .bind(sku.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(movement_from_row).collect()
    }
}
