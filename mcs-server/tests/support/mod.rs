#![allow(dead_code)]

use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use mcs_config::{ConfigLoader, EnvConfig};
use mcs_core::ProcessSupervisor;
use mcs_server::{AppState, build_supervisor, create_app};
use tempfile::TempDir;

/// A started process service behind a real HTTP listener, with its
/// catalog directories and configuration file kept alive for the test.
pub struct TestProcess {
    pub server: TestServer,
    pub supervisor: Arc<ProcessSupervisor>,
    pub patterns: TempDir,
    pub parameters: TempDir,
    pub schemas: TempDir,
    _config_dir: TempDir,
}

fn catalog_dir(entries: &[&str]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for entry in entries {
        fs::write(dir.path().join(entry), b"{}")?;
    }
    Ok(dir)
}

fn toml_path(path: &Path) -> String {
    path.display().to_string()
}

fn serve(state: AppState) -> Result<TestServer> {
    TestServer::builder()
        .http_transport()
        .build(create_app(state))
        .map_err(|err| anyhow!(err.to_string()))
}

/// Loads a configuration with sequences `S1` (3 steps) and `S2` (1 step)
/// and assembles the supervisor. `start` controls whether it is brought up.
pub async fn build_test_process(step_interval_ms: u64, start: bool) -> Result<TestProcess> {
    let patterns = catalog_dir(&["square.json", "ramp.json"])?;
    let parameters = catalog_dir(&["gain.json"])?;
    let schemas = catalog_dir(&["recipe.json"])?;

    let config_dir = TempDir::new()?;
    let config_path = config_dir.path().join("mcs.toml");
    fs::write(
        &config_path,
        format!(
            r#"
            [service]
            name = "process"
            version = "1.2.3"
            mode = "simulation"

            [lifecycle]
            call_timeout_ms = 2000

            [notifications]
            queue_capacity = 16

            [sequences]
            step_interval_ms = {step_interval_ms}

            [[sequences.definitions]]
            id = "S1"
            name = "Warmup"
            steps = 3

            [[sequences.definitions]]
            id = "S2"
            name = "Purge"
            steps = 1

            [catalogs]
            pattern_dir = "{}"
            parameter_dir = "{}"
            schema_dir = "{}"
            "#,
            toml_path(patterns.path()),
            toml_path(parameters.path()),
            toml_path(schemas.path()),
        ),
    )?;

    let load = ConfigLoader::new()
        .with_config_path(&config_path)
        .with_env(EnvConfig::default())
        .load()?;
    let supervisor = build_supervisor(&load.config)?;

    if start {
        supervisor.initialize().await?;
        supervisor.start().await?;
    }

    let server = serve(AppState::new(Arc::clone(&supervisor)))?;

    Ok(TestProcess {
        server,
        supervisor,
        patterns,
        parameters,
        schemas,
        _config_dir: config_dir,
    })
}

pub fn server_without_supervisor() -> Result<TestServer> {
    serve(AppState::without_supervisor())
}

/// Polls `condition` every 10ms for up to two seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> Result<()> {
    for _ in 0..200 {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(anyhow!("condition not met within two seconds"))
}
