//! Timeout and cancellation around calls to remote services.
//!
//! Every embedding or generation request goes through a [`CallGuard`], so no
//! remote call can block a query forever unless the timeout is explicitly
//! disabled.

use crate::error::ServiceError;
use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CallGuard {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CallGuard {
    /// `timeout: None` waits for the service as long as it takes
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        CallGuard { timeout, cancel }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Drive `call` to completion unless it times out or the token is cancelled first
    pub async fn run<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Remote call did not finish within {:?}", limit);
                        Err(ServiceError::Timeout(limit))
                    }
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            result = bounded => result,
        }
    }
}
