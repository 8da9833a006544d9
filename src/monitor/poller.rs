//! Process-wide device health poller.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::device::{DeviceApi, DeviceError, DeviceState};
use crate::core::event::ChatId;
use crate::core::transport::{notify, ChatTransport};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Result of one polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    State(DeviceState),
    /// The query failed even after any credential refresh.
    Skipped,
}

/// Polls a device on a fixed interval and alerts a chat while it is alerting.
pub struct DevicePoller {
    api: Arc<dyn DeviceApi>,
    transport: Arc<dyn ChatTransport>,
    alert_chat: ChatId,
    policy: RetryPolicy,
    token: String,
}

impl DevicePoller {
    /// Authenticate once. A failure here is fatal to the caller.
    pub async fn connect(
        api: Arc<dyn DeviceApi>,
        transport: Arc<dyn ChatTransport>,
        alert_chat: ChatId,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let token = api
            .authenticate()
            .await
            .map_err(|e| Error::Device(format!("initial authentication failed: {}", e)))?;
        tracing::info!("Device API authenticated");

        Ok(Self {
            api,
            transport,
            alert_chat,
            policy,
            token,
        })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll every interval until the retry policy gives up.
    pub async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.policy.interval, self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                PollOutcome::State(state) => {
                    failures = 0;
                    tracing::debug!("Device state: {:?}", state);
                }
                PollOutcome::Skipped => {
                    failures += 1;
                    if self.policy.exhausted(failures) {
                        tracing::error!("Device poller giving up after {} failed polls", failures);
                        return;
                    }
                }
            }
        }
    }

    /// One interval: query, refresh the credential once if rejected, alert if needed.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let code = match self.api.query_state(&self.token).await {
            Ok(code) => code,
            Err(DeviceError::Unauthorized) => {
                tracing::info!("Token expired, fetching a new one.");
                match self.api.authenticate().await {
                    Ok(token) => self.token = token,
                    Err(e) => {
                        tracing::warn!("Error getting new auth token: {}", e);
                        return PollOutcome::Skipped;
                    }
                }
                match self.api.query_state(&self.token).await {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::warn!("Error polling device with new token: {}", e);
                        return PollOutcome::Skipped;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Error polling device: {}", e);
                return PollOutcome::Skipped;
            }
        };

        let state = DeviceState::from_code(code);
        if state == DeviceState::Alerting {
            tracing::warn!("Device is alerting, notifying chat {}", self.alert_chat);
            notify(
                self.transport.as_ref(),
                self.alert_chat,
                &format!("Alert! {}", state.describe()),
            )
            .await;
        }
        PollOutcome::State(state)
    }
}
