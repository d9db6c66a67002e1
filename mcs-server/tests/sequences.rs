use anyhow::Result;
use axum::http::StatusCode;
use mcs_model::{
    CatalogEntryResponse, CatalogListResponse, SequenceListResponse,
    SequenceResponse, SequenceState, StatusResponse,
};
use serde_json::Value;

#[path = "support/mod.rs"]
mod support;

use support::{build_test_process, server_without_supervisor, wait_for};

#[tokio::test]
async fn lists_and_describes_configured_sequences() -> Result<()> {
    let process = build_test_process(10, true).await?;

    let response = process.server.get("/process/sequences").await;
    response.assert_status_ok();
    let list: SequenceListResponse = response.json();
    let ids: Vec<&str> = list.sequences.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["S1", "S2"]);

    let response = process.server.get("/process/sequences/S1").await;
    response.assert_status_ok();
    let sequence: SequenceResponse = response.json();
    assert_eq!(sequence.sequence.name, "Warmup");
    assert_eq!(sequence.sequence.steps, 3);

    Ok(())
}

#[tokio::test]
async fn start_runs_sequence_to_completion() -> Result<()> {
    let process = build_test_process(10, true).await?;

    let response = process.server.post("/process/sequences/S1/start").await;
    response.assert_status_ok();
    let started: StatusResponse = response.json();
    assert_eq!(started.status.state, SequenceState::Running);
    assert_eq!(started.status.current_step, 0);

    let supervisor = process.supervisor.clone();
    wait_for(|| {
        supervisor
            .sequence_status("S1")
            .map(|status| status.state == SequenceState::Completed)
            .unwrap_or(false)
    })
    .await?;

    let response = process.server.get("/process/sequences/S1/status").await;
    response.assert_status_ok();
    let finished: StatusResponse = response.json();
    assert_eq!(finished.status.state, SequenceState::Completed);
    assert_eq!(finished.status.current_step, 3);
    assert_eq!(finished.status.progress, 1.0);
    assert!(finished.status.revision > started.status.revision);

    Ok(())
}

#[tokio::test]
async fn starting_a_running_sequence_conflicts() -> Result<()> {
    let process = build_test_process(1_000, true).await?;

    process
        .server
        .post("/process/sequences/S1/start")
        .await
        .assert_status_ok();

    let response = process.server.post("/process/sequences/S1/start").await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 409);

    let response = process.server.post("/process/sequences/S1/stop").await;
    response.assert_status_ok();
    let stopped: StatusResponse = response.json();
    assert_eq!(stopped.status.state, SequenceState::Stopped);

    Ok(())
}

#[tokio::test]
async fn stopping_an_idle_sequence_returns_its_status() -> Result<()> {
    let process = build_test_process(10, true).await?;

    let response = process.server.post("/process/sequences/S2/stop").await;
    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.status.state, SequenceState::Idle);
    assert_eq!(status.status.revision, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_sequence_is_not_found() -> Result<()> {
    let process = build_test_process(10, true).await?;

    for (method, path) in [
        ("get", "/process/sequences/S9"),
        ("get", "/process/sequences/S9/status"),
        ("post", "/process/sequences/S9/start"),
        ("post", "/process/sequences/S9/stop"),
    ] {
        let response = match method {
            "post" => process.server.post(path).await,
            _ => process.server.get(path).await,
        };
        response.assert_status(StatusCode::NOT_FOUND);
    }

    Ok(())
}

#[tokio::test]
async fn control_surface_is_unavailable_until_started() -> Result<()> {
    let process = build_test_process(10, false).await?;

    process
        .server
        .post("/process/sequences/S1/start")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    process
        .server
        .get("/process/sequences")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    process
        .server
        .get("/process/patterns")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let server = server_without_supervisor()?;
    server
        .get("/process/sequences/S1/status")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    Ok(())
}

#[tokio::test]
async fn catalogs_list_indexed_entries() -> Result<()> {
    let process = build_test_process(10, true).await?;

    let response = process.server.get("/process/patterns").await;
    response.assert_status_ok();
    let patterns: CatalogListResponse = response.json();
    assert_eq!(patterns.catalog, "pattern");
    assert_eq!(patterns.entries, vec!["ramp", "square"]);

    let response = process.server.get("/process/parameters/gain").await;
    response.assert_status_ok();
    let entry: CatalogEntryResponse = response.json();
    assert_eq!(entry.catalog, "parameter");
    assert_eq!(entry.name, "gain");

    process
        .server
        .get("/process/schemas/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}
