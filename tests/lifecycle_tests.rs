//! End-to-end coverage of the provisioning → activation → status → deactivation path, plus
//! seat limits, duplicate activation, and lifecycle gating at the HTTP boundary.

mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn provision_activate_and_status_happy_path() {
    let server = common::spawn().await;

    let provision_body = json!({
        "customer_email": "buyer@example.com",
        "products": [server.product.id],
        "max_seats": 2,
    });
    let res = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&provision_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let provisioned: Value = res.json().await.unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();
    assert_eq!(provisioned["licenses"][0]["status"], "valid");
    assert_eq!(provisioned["licenses"][0]["seat_limit"], 2);

    let activate_body = json!({
        "product_slug": server.product.slug,
        "instance_identifier": "host-one",
        "instance_type": "hostname",
    });
    let res = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&activate_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let activation: Value = res.json().await.unwrap();
    assert_eq!(activation["reactivated"], false);

    let res = server
        .client
        .get(format!("{}/api/v1/product/status", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["licenses"][0]["product_name"], server.product.name);
    assert_eq!(status["licenses"][0]["seats_used"], 1);
    assert_eq!(status["licenses"][0]["seats_remaining"], 1);
    assert_eq!(status["licenses"][0]["is_valid"], true);
    assert_eq!(status["total_seats_used"], 1);
    assert_eq!(status["total_seats_available"], 1);
    assert_eq!(status["is_valid"], true);

    let activation_id = activation["id"].as_str().unwrap();
    let res = server
        .client
        .delete(format!("{}/api/v1/product/activations/{activation_id}", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);
}

#[tokio::test]
async fn seat_limit_is_enforced() {
    let server = common::spawn().await;

    let provision_body = json!({
        "customer_email": "single-seat@example.com",
        "products": [server.product.id],
        "max_seats": 1,
    });
    let res = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&provision_body)
        .send()
        .await
        .unwrap();
    let provisioned: Value = res.json().await.unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();

    let first = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&json!({
            "product_slug": server.product.slug,
            "instance_identifier": "host-a",
            "instance_type": "hostname",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&json!({
            "product_slug": server.product.slug,
            "instance_identifier": "host-b",
            "instance_type": "hostname",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 422);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["code"], "SEAT_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn reactivating_a_deactivated_instance_reuses_its_activation_id() {
    let server = common::spawn().await;

    let provisioned: Value = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"customer_email": "dup@example.com", "products": [server.product.id], "max_seats": 1}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();

    let activate_body = json!({
        "product_slug": server.product.slug,
        "instance_identifier": "same-host",
        "instance_type": "hostname",
    });

    let first = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&activate_body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let first_body: Value = first.json().await.unwrap();
    assert_eq!(first_body["reactivated"], false);

    let activation_id = first_body["id"].as_str().unwrap();
    let res = server
        .client
        .delete(format!("{}/api/v1/product/activations/{activation_id}", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let second = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&activate_body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 201);
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(first_body["id"], second_body["id"]);
    assert_eq!(second_body["reactivated"], true);
}

#[tokio::test]
async fn activating_an_already_active_instance_is_rejected_as_a_conflict() {
    let server = common::spawn().await;

    let provisioned: Value = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"customer_email": "conflict@example.com", "products": [server.product.id], "max_seats": 2}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();

    let activate_body = json!({
        "product_slug": server.product.slug,
        "instance_identifier": "same-host",
        "instance_type": "hostname",
    });

    let first = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&activate_body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&activate_body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_ACTIVE");
}

#[tokio::test]
async fn suspended_license_rejects_activation() {
    let server = common::spawn().await;

    let provisioned: Value = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"customer_email": "suspend@example.com", "products": [server.product.id]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let raw_license_key = provisioned["license_key"]["key"].as_str().unwrap().to_string();
    let license_id = provisioned["licenses"][0]["id"].as_str().unwrap();

    let res = server
        .client
        .patch(format!("{}/api/v1/brand/licenses/{license_id}/suspend", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"reason": "chargeback"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let suspended: Value = res.json().await.unwrap();
    assert_eq!(suspended["status"], "suspended");

    let res = server
        .client
        .post(format!("{}/api/v1/product/activate", server.base_url))
        .header("X-License-Key", &raw_license_key)
        .json(&json!({
            "product_slug": server.product.slug,
            "instance_identifier": "host-x",
            "instance_type": "hostname",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "LICENSE_SUSPENDED");

    let res = server
        .client
        .patch(format!("{}/api/v1/brand/licenses/{license_id}/resume", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap()["status"], "valid");
}

#[tokio::test]
async fn cancelled_license_cannot_be_renewed() {
    let server = common::spawn().await;

    let provisioned: Value = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"customer_email": "cancel@example.com", "products": [server.product.id]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let license_id = provisioned["licenses"][0]["id"].as_str().unwrap();

    let res = server
        .client
        .patch(format!("{}/api/v1/brand/licenses/{license_id}/cancel", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = server
        .client
        .patch(format!("{}/api/v1/brand/licenses/{license_id}/renew", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"expiration_date": common::future_rfc3339(3600)}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
}

#[tokio::test]
async fn read_scope_key_cannot_provision() {
    let server = common::spawn().await;

    let res = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.read_api_key)
        .json(&json!({"customer_email": "nope@example.com", "products": [server.product.id]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn read_scope_key_can_list_by_email() {
    let server = common::spawn().await;

    server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .json(&json!({"customer_email": "listable@example.com", "products": [server.product.id]}))
        .send()
        .await
        .unwrap();

    let res = server
        .client
        .get(format!("{}/api/v1/brand/licenses?email=listable@example.com", server.base_url))
        .header("X-API-Key", &server.read_api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let results: Value = res.json().await.unwrap();
    assert_eq!(results.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let server = common::spawn().await;

    let res = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .json(&json!({"customer_email": "x@example.com", "products": [server.product.id]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn provision_is_idempotent_under_the_same_key() {
    let server = common::spawn().await;

    let body = json!({"customer_email": "replay@example.com", "products": [server.product.id]});

    let first = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .header("Idempotency-Key", "replay-key-1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let first_body: Value = first.json().await.unwrap();

    let second = server
        .client
        .post(format!("{}/api/v1/brand/licenses/provision", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .header("Idempotency-Key", "replay-key-1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 201);
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(first_body, second_body);

    let res = server
        .client
        .get(format!("{}/api/v1/brand/licenses?email=replay@example.com", server.base_url))
        .header("X-API-Key", &server.full_api_key)
        .send()
        .await
        .unwrap();
    let results: Value = res.json().await.unwrap();
    assert_eq!(results.as_array().unwrap().len(), 1, "the replayed request must not have provisioned twice");
}
