/// Postgres persistence for application records.
///
/// Applications are append-only: one insert per submission, reads by id,
/// business number, or user. `application_number` carries a unique constraint;
/// the orchestrator retries once with a fresh number on a duplicate.
use crate::errors::AppError;
use crate::models::{ApplicationRecord, ApplicationStatus, ServiceType, ValidationResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Postgres duplicate-key SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub async fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub struct ApplicationStore {
    pool: PgPool,
}

impl ApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the applications table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id UUID PRIMARY KEY,
                application_number TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                service_type TEXT NOT NULL,
                document_urls JSONB NOT NULL DEFAULT '[]',
                validation_results JSONB NOT NULL DEFAULT '[]',
                overall_status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_applications_user_id ON applications (user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts one application. A duplicate application number surfaces as
    /// `Conflict` so the caller can regenerate and retry.
    pub async fn insert(&self, record: &ApplicationRecord) -> Result<(), AppError> {
        let document_urls = serde_json::to_value(&record.document_urls)
            .map_err(|e| AppError::InternalError(format!("Failed to encode urls: {}", e)))?;
        let validation_results = serde_json::to_value(&record.validation_results)
            .map_err(|e| AppError::InternalError(format!("Failed to encode results: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO applications
                (id, application_number, user_id, service_type,
                 document_urls, validation_results, overall_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(&record.application_number)
        .bind(&record.user_id)
        .bind(record.service_type.as_str())
        .bind(document_urls)
        .bind(validation_results)
        .bind(record.overall_status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Application number {} already exists",
                    record.application_number
                ))
            } else {
                AppError::DatabaseError(e)
            }
        })?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ApplicationRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, application_number, user_id, service_type,
                    document_urls, validation_results, overall_status, created_at
             FROM applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    pub async fn find_by_number(
        &self,
        application_number: &str,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, application_number, user_id, service_type,
                    document_urls, validation_results, overall_status, created_at
             FROM applications WHERE application_number = $1",
        )
        .bind(application_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<ApplicationRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, application_number, user_id, service_type,
                    document_urls, validation_results, overall_status, created_at
             FROM applications WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

fn row_to_record(row: sqlx::postgres::PgRow) -> Result<ApplicationRecord, AppError> {
    let service_type: String = row.try_get("service_type")?;
    let overall_status: String = row.try_get("overall_status")?;
    let document_urls: serde_json::Value = row.try_get("document_urls")?;
    let validation_results: serde_json::Value = row.try_get("validation_results")?;

    let document_urls: Vec<String> = serde_json::from_value(document_urls)
        .map_err(|e| AppError::InternalError(format!("Corrupt document_urls column: {}", e)))?;
    let validation_results: Vec<ValidationResult> = serde_json::from_value(validation_results)
        .map_err(|e| {
            AppError::InternalError(format!("Corrupt validation_results column: {}", e))
        })?;
    let overall_status = ApplicationStatus::parse(&overall_status).ok_or_else(|| {
        AppError::InternalError(format!("Corrupt overall_status column: {}", overall_status))
    })?;

    Ok(ApplicationRecord {
        id: row.try_get("id")?,
        application_number: row.try_get("application_number")?,
        user_id: row.try_get("user_id")?,
        service_type: ServiceType::from(service_type),
        document_urls,
        validation_results,
        overall_status,
        created_at: row.try_get("created_at")?,
    })
}
