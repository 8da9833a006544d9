//! Flatbed scanner access through SANE's `scanimage`.

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::config::ScannerConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan one page and return it as JPEG bytes.
    async fn scan(&self) -> Result<Vec<u8>>;
}

pub struct ScanImage {
    command: String,
    resolution: u32,
}

impl ScanImage {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            command: config.command.clone(),
            resolution: config.resolution,
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--format=jpeg".to_string(),
            format!("--resolution={}", self.resolution),
        ]
    }
}

#[async_trait]
impl Scanner for ScanImage {
    async fn scan(&self) -> Result<Vec<u8>> {
        tracing::info!("Running {} {:?}", self.command, self.args());
        let output = TokioCommand::new(&self.command)
            .args(self.args())
            .output()
            .await
            .map_err(|e| Error::Scanner(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(Error::Scanner(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(Error::Scanner("scanner produced no image".to_string()));
        }

        tracing::info!("Scanned {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}
