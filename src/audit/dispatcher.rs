//! Fire-and-forget delivery of log events to a [`LogStorer`].

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::audit::events::{LogStorer, RequestLog, ResponseLog};

/// Handle to an in-flight request log write.
#[derive(Debug)]
pub struct PendingRequestLog {
    task: Option<JoinHandle<()>>,
}

impl PendingRequestLog {
    /// A handle with nothing to wait for.
    pub fn none() -> Self {
        Self { task: None }
    }

    async fn wait(self) {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Request log task failed");
            }
        }
    }
}

/// Spawns log storage off the request path.
#[derive(Clone)]
pub struct LogDispatcher {
    storer: Arc<dyn LogStorer>,
}

impl LogDispatcher {
    pub fn new(storer: Arc<dyn LogStorer>) -> Self {
        Self { storer }
    }

    /// Store `log` in the background.
    pub fn request(&self, log: RequestLog) -> PendingRequestLog {
        let storer = Arc::clone(&self.storer);
        match Handle::try_current() {
            Ok(handle) => PendingRequestLog {
                task: Some(handle.spawn(async move { storer.store_request_log(log).await })),
            },
            Err(_) => {
                tracing::warn!(
                    request_id = %log.request_id,
                    "No runtime available, request log dropped"
                );
                PendingRequestLog::none()
            }
        }
    }

    /// Store the response log produced by `log` once both `log` and
    /// `pending` have completed.
    ///
    /// `log` typically waits for the response body to finish streaming.
    pub fn response<F>(&self, pending: PendingRequestLog, log: F)
    where
        F: Future<Output = ResponseLog> + Send + 'static,
    {
        let storer = Arc::clone(&self.storer);
        let task = async move {
            let log = log.await;
            pending.wait().await;
            storer.store_response_log(log).await;
        };

        if Handle::try_current().map(|h| h.spawn(task)).is_err() {
            tracing::warn!("No runtime available, response log dropped");
        }
    }
}
