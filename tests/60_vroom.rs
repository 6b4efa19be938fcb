mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn solution_is_passed_through() -> Result<()> {
    let solution = json!({ "code": 0, "summary": { "cost": 4821, "routes": 1 }, "routes": [] });
    let (vroom_url, _vroom) = common::start_fake_vroom(StatusCode::OK, solution.clone()).await?;
    let server = common::start_server_with_vroom(vroom_url).await?;

    let res = server
        .client
        .post(server.url("/api/vroom"))
        .bearer_auth(common::dispatcher_token())
        .json(&common::vroom_problem())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"], solution);
    Ok(())
}

#[tokio::test]
async fn drivers_may_not_optimize() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/vroom"))
        .bearer_auth(common::driver_token(common::DRIVER_A))
        .json(&common::vroom_problem())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn incomplete_problem_is_400() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/vroom"))
        .bearer_auth(common::admin_token())
        .json(&json!({ "vehicles": [] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unreachable_optimizer_is_502() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/api/vroom"))
        .bearer_auth(common::admin_token())
        .json(&common::vroom_problem())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.json::<Value>().await?["code"], "BAD_GATEWAY");
    Ok(())
}

#[tokio::test]
async fn solver_error_is_502() -> Result<()> {
    let (vroom_url, _vroom) =
        common::start_fake_vroom(StatusCode::OK, json!({ "code": 2, "error": "Invalid vehicles." })).await?;
    let server = common::start_server_with_vroom(vroom_url).await?;

    let res = server
        .client
        .post(server.url("/api/vroom"))
        .bearer_auth(common::admin_token())
        .json(&common::vroom_problem())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}
