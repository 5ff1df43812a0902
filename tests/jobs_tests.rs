//! Exercises the license expiration sweep against a real database: it must flip `valid`
//! licenses past their `expires_at` to `expired` and invalidate their cached status.

mod common;

use chrono::{Duration, Utc};
use warden::jobs::run_license_expiration_check;

#[tokio::test]
async fn sweep_expires_past_due_licenses_and_invalidates_their_cache() {
    let server = common::spawn().await;

    let provisioned: serde_json::Value = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&serde_json::json!({
            "customer_email": "sweep@example.com",
            "products": [server.product.id],
            "expiration_date": common::future_rfc3339(3600),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();
    let license_id: uuid::Uuid = provisioned["licenses"][0]["id"].as_str().unwrap().parse().unwrap();

    // Populate the status cache, then force the stored row to be already past due, simulating
    // a license that lapsed after its status was last read.
    let res = server
        .client
        .get(format!("{}/api/v1/product/status", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .send()
        .await
        .unwrap();
    let cached: serde_json::Value = res.json().await.unwrap();
    assert_eq!(cached["licenses"][0]["status"], "valid");

    let mut stored = server.db.get_license(license_id).await.unwrap().unwrap();
    stored.expires_at = Some(Utc::now() - Duration::seconds(1));
    server.db.update_license(&stored).await.unwrap();

    let count = run_license_expiration_check(&server.db, &server.status_cache).await.unwrap();
    assert_eq!(count, 1);

    let swept = server.db.get_license(license_id).await.unwrap().unwrap();
    assert_eq!(swept.status.to_string(), "expired");

    let res = server
        .client
        .get(format!("{}/api/v1/product/status", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .send()
        .await
        .unwrap();
    let after: serde_json::Value = res.json().await.unwrap();
    assert_eq!(after["licenses"][0]["status"], "expired");
}

#[tokio::test]
async fn sweep_is_a_no_op_when_nothing_is_past_due() {
    let server = common::spawn().await;
    let count = run_license_expiration_check(&server.db, &server.status_cache).await.unwrap();
    assert_eq!(count, 0);
}
