use crate::{Error, Result, config::InferenceConfig};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs blocking inference jobs on tokio's blocking threads, at most
/// `max_jobs` at a time, each bounded by a timeout.
#[derive(Clone)]
pub struct InferencePool {
    permits: Arc<Semaphore>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl InferencePool {
    pub fn new(max_jobs: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_jobs)),
            timeout,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(
            config.max_concurrent_jobs,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Cancels every queued and running job and refuses new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.permits.close();
    }

    /// Submits `job` and waits for its result.
    ///
    /// The timeout covers both waiting for a permit and running. The job's
    /// token is cancelled when the timeout fires, when the caller stops
    /// waiting, or on shutdown; the job is expected to check it and return.
    /// A permit stays taken until the job has actually returned.
    pub async fn submit<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = self.shutdown.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let token = cancel.clone();
        let permits = self.permits.clone();
        let run = async move {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::PoolClosed)?;
            debug!(
                "Inference job admitted, {} permits left",
                permits.available_permits()
            );
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job(&token)
            })
            .await
            .map_err(|e| Error::internal(format!("inference worker failed: {}", e)))?
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, run) => match result {
                Ok(result) => result,
                Err(_) => {
                    warn!("Inference job timed out after {:?}", self.timeout);
                    Err(Error::Timeout(self.timeout))
                }
            },
        }
    }
}
