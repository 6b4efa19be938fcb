mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use fleet_dispatch_api::gateway::ResourceType;

#[tokio::test]
async fn admin_creates_and_reads_a_truck() -> Result<()> {
    let server = common::start_server().await?;
    let token = common::admin_token();

    let res = server
        .client
        .post(server.url("/api/trucks"))
        .bearer_auth(&token)
        .json(&json!({ "make": "Volvo", "model": "VNL 860", "year": 2023, "next_maintenance_date": "09/15/2024" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let created = res.json::<Value>().await?["data"].clone();
    assert_eq!(created["next_maintenance_date"], "2024-09-15");
    let id = created["id"].as_str().unwrap().to_string();

    let res = server
        .client
        .get(server.url(&format!("/api/trucks/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["model"], "VNL 860");
    Ok(())
}

#[tokio::test]
async fn validation_failures_are_400_with_field_errors() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/loads"))
        .bearer_auth(common::dispatcher_token())
        .json(&json!({ "origin": "Dallas, TX", "weight": -5, "status": "LOST" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields = body["field_errors"].as_object().unwrap();
    assert!(fields.contains_key("destination"));
    assert!(fields.contains_key("weight"));
    assert!(fields.contains_key("status"));
    assert_eq!(server.store.snapshot(ResourceType::Load).await.len(), 6);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_400_for_authenticated_callers() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/trucks"))
        .bearer_auth(common::admin_token())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"].get("body").is_some());
    Ok(())
}

#[tokio::test]
async fn forbidden_operations_are_403() -> Result<()> {
    let server = common::start_server().await?;
    let client = &server.client;

    let cases = vec![
        client.delete(server.url("/api/trucks/truck-1")).bearer_auth(common::admin_token()),
        client.get(server.url("/api/trucks")).bearer_auth(common::driver_token(common::DRIVER_A)),
        client.get(server.url("/api/users")).bearer_auth(common::dispatcher_token()),
        client
            .post(server.url("/api/drivers"))
            .bearer_auth(common::dispatcher_token())
            .json(&json!({ "first_name": "Cy", "last_name": "New" })),
    ];

    for request in cases {
        let res = request.send().await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.json::<Value>().await?["code"], "FORBIDDEN");
    }
    assert_eq!(server.store.snapshot(ResourceType::Truck).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_records_and_unknown_resources_are_404() -> Result<()> {
    let server = common::start_server().await?;
    let token = common::admin_token();

    let res = server
        .client
        .patch(server.url("/api/trucks/truck-404"))
        .bearer_auth(&token)
        .json(&json!({ "mileage": 1200 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.get(server.url("/api/spaceships")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn driver_sees_other_drivers_loads_as_missing() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .get(server.url("/api/loads/load-2"))
        .bearer_auth(common::driver_token(common::DRIVER_A))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .get(server.url("/api/loads/load-1"))
        .bearer_auth(common::driver_token(common::DRIVER_A))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn role_assignment_is_admin_only_and_validated() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .patch(server.url("/api/users/driver-a/role"))
        .bearer_auth(common::dispatcher_token())
        .json(&json!({ "role": "ADMIN" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .patch(server.url("/api/users/driver-a/role"))
        .bearer_auth(common::admin_token())
        .json(&json!({ "role": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .patch(server.url("/api/users/driver-a/role"))
        .bearer_auth(common::admin_token())
        .json(&json!({ "role": "DISPATCHER", "name": "ignored" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["role"], "DISPATCHER");
    assert_eq!(body["data"]["name"], "Ann Driver");
    Ok(())
}

#[tokio::test]
async fn delete_returns_the_removed_record() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .delete(server.url("/api/loads/load-3"))
        .bearer_auth(common::dispatcher_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["id"], "load-3");
    assert_eq!(server.store.snapshot(ResourceType::Load).await.len(), 5);
    Ok(())
}
