use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{
    adjust_timeout,
    client::{ClientError, StackClient},
    status::Status,
    timeouts,
};

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("{message}")]
    Timeout { message: String },
    #[error("{message}")]
    Failed { message: String },
}

/// Poll a snapshot until it reports ready, an unrecoverable condition
/// appears, or the deadline (doubled in slow environments) runs out. The
/// last snapshot feeds the timeout diagnostic.
#[async_trait]
pub trait ReadinessCheck<'a> {
    type Data: Send;

    async fn collect(&'a self) -> Self::Data;

    fn is_ready(&self, data: &Self::Data) -> bool;

    /// Condition under which waiting longer is pointless.
    fn fail_fast(&self, _data: &Self::Data) -> Option<String> {
        None
    }

    fn timeout_message(&self, data: Self::Data) -> String;

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(200)
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn wait(&'a self) -> Result<(), ReadinessError> {
        let timeout_duration = adjust_timeout(self.deadline());
        let poll_interval = self.poll_interval();
        let mut data = self.collect().await;

        let wait_result = timeout(timeout_duration, async {
            loop {
                if let Some(message) = self.fail_fast(&data) {
                    return Err(ReadinessError::Failed { message });
                }
                if self.is_ready(&data) {
                    return Ok(());
                }

                sleep(poll_interval).await;

                data = self.collect().await;
            }
        })
        .await;

        match wait_result {
            Ok(result) => result,
            Err(_) => Err(ReadinessError::Timeout {
                message: self.timeout_message(data),
            }),
        }
    }
}

/// Readiness over `stack status`: every machine and unit agent must
/// report `started`. Any agent in the error state aborts the wait.
pub struct StartedCheck<'a> {
    pub(crate) client: &'a StackClient,
}

#[async_trait]
impl<'a> ReadinessCheck<'a> for StartedCheck<'a> {
    type Data = Result<Status, ClientError>;

    async fn collect(&'a self) -> Self::Data {
        let result = self.client.status().await;
        match &result {
            Ok(status) => debug!(
                environment = %self.client.environment(),
                agents = %status.agent_state_summary(),
                "polled agent states"
            ),
            Err(error) => warn!(
                environment = %self.client.environment(),
                %error,
                "status probe failed during wait"
            ),
        }
        result
    }

    fn is_ready(&self, data: &Self::Data) -> bool {
        data.as_ref().is_ok_and(Status::all_started)
    }

    fn fail_fast(&self, data: &Self::Data) -> Option<String> {
        let status = data.as_ref().ok()?;
        let errored = status.errored_agents();
        if errored.is_empty() {
            None
        } else {
            Some(format!(
                "agents in environment {} entered the error state: {}",
                self.client.environment(),
                errored.join(", ")
            ))
        }
    }

    fn timeout_message(&self, data: Self::Data) -> String {
        let last_seen = match data {
            Ok(status) => status.agent_state_summary(),
            Err(error) => format!("last status probe failed: {error}"),
        };
        format!(
            "timed out waiting for environment {} to start: {last_seen}",
            self.client.environment()
        )
    }

    fn poll_interval(&self) -> Duration {
        timeouts::wait_poll_interval()
    }

    fn deadline(&self) -> Duration {
        timeouts::wait_for_started_timeout()
    }
}
