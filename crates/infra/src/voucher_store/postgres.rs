//! Postgres-backed voucher store.
//!
//! Voucher documents live in a JSONB column next to their identifying
//! columns:
//!
//! ```sql
//! CREATE TABLE vouchers (
//!     seq      BIGSERIAL PRIMARY KEY,
//!     id       TEXT NOT NULL UNIQUE,
//!     sign     TEXT NOT NULL,
//!     document JSONB NOT NULL
//! );
//! CREATE INDEX vouchers_sign_idx ON vouchers (sign);
//! ```
//!
//! `id` and `sign` columns are authoritative; they overwrite `_id`/`sign` keys
//! inside `document` when the row is read.
//!
//! ## Error Mapping
//!
//! | SQLx Error | VoucherStoreError |
//! |------------|-------------------|
//! | `ColumnDecode`, `ColumnNotFound`, `Decode`, `TypeNotFound` | `Malformed` |
//! | `Io`, `Tls`, `PoolTimedOut`, `PoolClosed`, anything else | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use voucherbook_core::Sign;
use voucherbook_vouchers::Voucher;

use super::r#trait::{VoucherStore, VoucherStoreError};
use crate::config::InfraConfig;

#[derive(Debug, Clone)]
pub struct PostgresVoucherStore {
    pool: Arc<PgPool>,
}

impl PostgresVoucherStore {
    /// Create a new PostgresVoucherStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool using `DATABASE_URL` and the configured pool size.
    pub async fn connect(config: &InfraConfig) -> Result<Self, VoucherStoreError> {
        let url = config
            .require_database_url()
            .map_err(|e| VoucherStoreError::Unavailable(e.to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::new(pool))
    }
}

fn map_sqlx_error(err: sqlx::Error) -> VoucherStoreError {
    match &err {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => VoucherStoreError::Malformed(err.to_string()),
        _ => VoucherStoreError::Unavailable(err.to_string()),
    }
}

fn voucher_from_row(row: &PgRow) -> Result<Voucher, VoucherStoreError> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let sign: String = row.try_get("sign").map_err(map_sqlx_error)?;
    let document: JsonValue = row.try_get("document").map_err(map_sqlx_error)?;

    let JsonValue::Object(mut fields) = document else {
        return Err(VoucherStoreError::Malformed(format!(
            "voucher {id}: document is not a JSON object"
        )));
    };
    fields.insert("_id".to_string(), JsonValue::String(id.clone()));
    fields.insert("sign".to_string(), JsonValue::String(sign));

    serde_json::from_value(JsonValue::Object(fields))
        .map_err(|e| VoucherStoreError::Malformed(format!("voucher {id}: {e}")))
}

#[async_trait]
impl VoucherStore for PostgresVoucherStore {
    #[instrument(skip(self, sign), fields(sign = %sign))]
    async fn find_by_sign(&self, sign: &Sign) -> Result<Vec<Voucher>, VoucherStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sign, document
            FROM vouchers
            WHERE sign = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(sign.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(voucher_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_map_to_malformed() {
        let err = map_sqlx_error(sqlx::Error::ColumnNotFound("document".to_string()));
        assert!(matches!(err, VoucherStoreError::Malformed(_)));
    }

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            VoucherStoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            VoucherStoreError::Unavailable(_)
        ));
    }
}
