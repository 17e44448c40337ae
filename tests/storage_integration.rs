use chrono::Utc;
use std::env;
use uuid::Uuid;

use rust_kyc_api::errors::AppError;
use rust_kyc_api::models::{
    ApplicationRecord, ApplicationStatus, ServiceType, ValidationResult, ValidationStatus,
};
use rust_kyc_api::storage::{connect_pool, ApplicationStore};

/// Integration smoke test for the applications table.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn application_insert_and_lookup_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let pool = connect_pool(&db_url).await?;
    let store = ApplicationStore::new(pool);
    store.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Unique number per run to avoid conflicts on repeated runs.
    let number = format!("CC-{:06}", Uuid::new_v4().as_u128() % 900_000 + 100_000);
    let record = ApplicationRecord {
        id: Uuid::new_v4(),
        application_number: number.clone(),
        user_id: "smoke-test@example.com".to_string(),
        service_type: ServiceType::CreditCard,
        document_urls: vec!["./uploads/test_pan.png".to_string()],
        validation_results: vec![ValidationResult {
            file_name: "pan.png".to_string(),
            document_type: "pan".to_string(),
            status: ValidationStatus::Passed,
            reason_code: "PanOcrMatch".to_string(),
        }],
        overall_status: ApplicationStatus::Approved,
        created_at: Utc::now(),
    };

    store
        .insert(&record)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let fetched = store
        .find_by_number(&number)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("inserted application not found"))?;

    assert_eq!(fetched.id, record.id);
    assert_eq!(fetched.user_id, record.user_id);
    assert_eq!(fetched.service_type, ServiceType::CreditCard);
    assert_eq!(fetched.overall_status, ApplicationStatus::Approved);
    assert_eq!(fetched.validation_results, record.validation_results);

    // A second insert with the same number must surface as a conflict.
    let duplicate = ApplicationRecord {
        id: Uuid::new_v4(),
        ..record
    };
    match store.insert(&duplicate).await {
        Err(AppError::Conflict(_)) => {}
        other => anyhow::bail!("expected Conflict on duplicate number, got {:?}", other.err()),
    }

    Ok(())
}
