//! Container restarts through the docker CLI.

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::error::{Error, Result};

#[async_trait]
pub trait ContainerRestart: Send + Sync {
    async fn restart(&self, name: &str) -> Result<()>;
}

/// Runs `docker restart <name>`.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    #[cfg(test)]
    fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRestart for DockerCli {
    async fn restart(&self, name: &str) -> Result<()> {
        let output = TokioCommand::new(&self.binary)
            .args(["restart", name])
            .output()
            .await
            .map_err(|e| Error::Container(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Container(format!(
                "restarting {} failed: {}",
                name,
                stderr.trim()
            )));
        }

        tracing::info!("Restarted container {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_a_container_error() {
        let docker = DockerCli::with_binary("/nonexistent/docker-binary");
        let err = docker.restart("transmission-rss").await.unwrap_err();
        assert!(matches!(err, Error::Container(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        // `false restart <name>` exits 1.
        let docker = DockerCli::with_binary("false");
        let err = docker.restart("transmission-rss").await.unwrap_err();
        assert!(err.to_string().contains("transmission-rss"));
    }
}
