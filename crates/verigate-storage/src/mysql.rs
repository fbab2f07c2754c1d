use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use verigate_core::error::{Result, StoreError};
use verigate_core::{RecordStore, RedirectId, RedirectRecord, UserId, VerificationRecord};

/// MySQL implementation of the record store contract.
///
/// Timestamps are stored as unix seconds. Schema lives in `ddl/mysql`.
#[derive(Debug, Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Inserts or replaces a verification record.
    ///
    /// Issuance belongs to the bot side; this exists for seeding and tests.
    pub async fn put_verification(&self, record: &VerificationRecord) -> Result<()> {
        sqlx::query(
            r#"
            REPLACE INTO verifications
                (user_id, page_token, verify_token, is_verified, created_at, verified_time)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id.get())
        .bind(&record.page_token)
        .bind(record.verify_token.as_deref())
        .bind(record.is_verified)
        .bind(record.created_at.as_second())
        .bind(record.verified_time.map(|ts| ts.as_second()))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StoreError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_user_id(raw: u64) -> Result<UserId> {
    UserId::new(raw).map_err(|_| StoreError::InvalidData(format!("invalid user_id '{raw}'")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn verification_from_row(row: &MySqlRow) -> Result<VerificationRecord> {
    let user_id: u64 = row.try_get("user_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let verified_time: Option<i64> = row.try_get("verified_time").map_err(map_sqlx_error)?;

    Ok(VerificationRecord {
        user_id: parse_user_id(user_id)?,
        page_token: row.try_get("page_token").map_err(map_sqlx_error)?,
        verify_token: row.try_get("verify_token").map_err(map_sqlx_error)?,
        is_verified: row.try_get("is_verified").map_err(map_sqlx_error)?,
        created_at: parse_timestamp("created_at", created_at)?,
        verified_time: verified_time
            .map(|seconds| parse_timestamp("verified_time", seconds))
            .transpose()?,
    })
}

fn redirect_from_row(row: &MySqlRow) -> Result<RedirectRecord> {
    let redirect_id: String = row.try_get("redirect_id").map_err(map_sqlx_error)?;
    let user_id: u64 = row.try_get("user_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(RedirectRecord {
        redirect_id: RedirectId::new_unchecked(redirect_id),
        shortlink: row.try_get("shortlink").map_err(map_sqlx_error)?,
        user_id: parse_user_id(user_id)?,
        created_at: parse_timestamp("created_at", created_at)?,
        visited: row.try_get("visited").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn get_verification(&self, user_id: UserId) -> Result<Option<VerificationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, page_token, verify_token, is_verified, created_at, verified_time
            FROM verifications
            WHERE user_id = ?
            LIMIT 1
            "#,
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(verification_from_row).transpose()
    }

    async fn get_redirect(&self, redirect_id: &RedirectId) -> Result<Option<RedirectRecord>> {
        let row = sqlx::query(
            r#"
            SELECT redirect_id, shortlink, user_id, created_at, visited
            FROM redirects
            WHERE redirect_id = ?
            LIMIT 1
            "#,
        )
        .bind(redirect_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(redirect_from_row).transpose()
    }

    async fn create_redirect(&self, record: RedirectRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO redirects (redirect_id, shortlink, user_id, created_at, visited)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.redirect_id.as_str())
        .bind(&record.shortlink)
        .bind(record.user_id.get())
        .bind(record.created_at.as_second())
        .bind(record.visited)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(record.redirect_id.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn mark_visited(&self, redirect_id: &RedirectId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE redirects
            SET visited = 1
            WHERE redirect_id = ?
            "#,
        )
        .bind(redirect_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
