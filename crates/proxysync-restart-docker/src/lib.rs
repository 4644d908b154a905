// # Docker Restart Action
//
// Restarts the reverse proxy container after its config files were rewritten.
//
// ## Strategy
//
// 1. `docker restart <container>`
// 2. If that fails (binary missing, container unknown, timeout):
//    `docker-compose restart <service>` from the compose directory
//
// Each command is bounded by the configured timeout and killed if it
// overruns. Output is captured and logged at debug level; stderr of a
// failed command ends up in the returned error.

use async_trait::async_trait;
use proxysync_core::traits::RestartTrigger;
use proxysync_core::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default compose directory of a Nginx Proxy Manager installation
const DEFAULT_COMPOSE_DIR: &str = "/data";

/// Default compose service running the proxy
const DEFAULT_COMPOSE_SERVICE: &str = "app";

/// Restart action driving the docker CLI
#[derive(Debug, Clone)]
pub struct DockerRestart {
    container: String,
    timeout: Duration,
    docker_program: String,
    compose_program: String,
    compose_dir: PathBuf,
    compose_service: String,
}

impl DockerRestart {
    /// Restart `container`, each command bounded by `timeout`
    pub fn new(container: impl Into<String>, timeout: Duration) -> Self {
        Self {
            container: container.into(),
            timeout,
            docker_program: "docker".to_string(),
            compose_program: "docker-compose".to_string(),
            compose_dir: PathBuf::from(DEFAULT_COMPOSE_DIR),
            compose_service: DEFAULT_COMPOSE_SERVICE.to_string(),
        }
    }

    /// Override the compose fallback location and service
    pub fn with_compose(mut self, dir: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        self.compose_dir = dir.into();
        self.compose_service = service.into();
        self
    }

    /// Override the executables (for wrappers such as `podman`)
    pub fn with_programs(mut self, docker: impl Into<String>, compose: impl Into<String>) -> Self {
        self.docker_program = docker.into();
        self.compose_program = compose.into();
        self
    }

    async fn run(&self, mut command: Command, label: &str) -> Result<()> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::restart(format!("{} timed out after {:?}", label, self.timeout)))?
            .map_err(|e| Error::restart(format!("{} could not be started: {}", label, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!("{}: {}", label, stdout.trim());
        }

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::restart(format!(
                "{} exited with {}: {}",
                label,
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[async_trait]
impl RestartTrigger for DockerRestart {
    async fn restart(&self) -> Result<()> {
        let mut docker = Command::new(&self.docker_program);
        docker.arg("restart").arg(&self.container);

        let primary = match self.run(docker, "docker restart").await {
            Ok(()) => {
                tracing::info!(container = %self.container, "Container restarted");
                return Ok(());
            }
            Err(e) => e,
        };

        tracing::warn!(
            container = %self.container,
            "{}; trying {} fallback",
            primary,
            self.compose_program
        );

        let mut compose = Command::new(&self.compose_program);
        compose
            .arg("restart")
            .arg(&self.compose_service)
            .current_dir(&self.compose_dir);

        match self.run(compose, "compose restart").await {
            Ok(()) => {
                tracing::info!(service = %self.compose_service, "Compose service restarted");
                Ok(())
            }
            Err(fallback) => Err(Error::restart(format!(
                "{}; {}",
                primary.to_string().trim_start_matches("Restart failed: "),
                fallback.to_string().trim_start_matches("Restart failed: ")
            ))),
        }
    }

    fn target(&self) -> &str {
        &self.container
    }
}
