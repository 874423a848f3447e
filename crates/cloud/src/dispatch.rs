//! The job dispatcher: hand-off protocol across the cold-boot boundary.
//!
//! A submit persists the job to object storage, points the instance at
//! it through boot metadata, triggers an idempotent start, then blocks
//! until the worker drops the completion marker, and finally resolves
//! time-limited read URLs for the produced images.
//!
//! The ordering is an invariant, not an accident: the job document and
//! metadata must be durable before the start is triggered, and both
//! before the completion poll begins, so a worker that boots and looks
//! for its job always finds one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use renderd_core::artifacts::image_artifacts;
use renderd_core::error::CoreError;
use renderd_core::job::{self, RenderJob, RenderRequest};
use renderd_core::location::StorageLocation;
use renderd_core::metadata::job_items;
use renderd_core::poll::{next_delay, PollPolicy};
use serde::Serialize;

use crate::lifecycle::LifecycleController;
use crate::provider::ComputeProvider;
use crate::store::ObjectStore;

/// Initial retry delay when the marker poll hits a storage error.
const ERROR_RETRY_INITIAL: Duration = Duration::from_secs(1);
/// Cap on the storage-error retry delay.
const ERROR_RETRY_MAX: Duration = Duration::from_secs(30);
/// Consecutive storage errors tolerated before the wait is abandoned.
const ERROR_RETRY_LIMIT: u32 = 8;

/// Successful submit result.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub job_id: String,
    /// Time-limited, pre-authenticated read URLs for each image.
    pub files: Vec<String>,
}

/// Settings for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Location job documents are persisted under.
    pub jobs: StorageLocation,
    /// Location the worker uploads artifacts and markers under.
    pub outputs: StorageLocation,
    /// Public URL of the instance boot script.
    pub startup_script_url: String,
    /// Poll policy for the completion marker.
    pub completion_wait: PollPolicy,
    /// Lifetime of the artifact read URLs.
    pub signed_url_expiry: Duration,
}

/// Dispatches render jobs to the single-tenant compute instance.
pub struct JobDispatcher {
    provider: Arc<dyn ComputeProvider>,
    controller: Arc<LifecycleController>,
    store: Arc<dyn ObjectStore>,
    config: DispatchConfig,
    in_flight: AtomicBool,
}

/// Releases the in-flight admission flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobDispatcher {
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        controller: Arc<LifecycleController>,
        store: Arc<dyn ObjectStore>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            provider,
            controller,
            store,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one render job end to end.
    ///
    /// Blocks for the full render duration. The instance is
    /// single-tenant, so a second submit while one is outstanding is
    /// rejected with a retryable conflict rather than silently racing on
    /// metadata and outputs.
    pub async fn submit(&self, request: &RenderRequest) -> Result<SubmitOutcome, CoreError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(CoreError::Conflict(
                "A render job is already in progress on this instance".to_string(),
            ));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let job_id = job::new_job_id();
        let job = RenderJob::prepare(&job_id, request)?;
        tracing::info!(job_id = %job_id, model_url = %job.model_url, "Render job accepted");

        // 1) Persist the job document.
        let job_key = job::job_object_key(&job_id);
        let document = serde_json::to_value(&job.workflow)
            .map_err(|e| CoreError::Internal(format!("Failed to encode workflow: {e}")))?;
        self.store
            .put_json(&self.config.jobs, &job_key, &document)
            .await?;

        // 2) Point the instance at the job via boot metadata. A failed
        //    submit leaves this and the document in place; both are
        //    orphaned and safely overwritten by a retry.
        let output_uri = self.config.outputs.uri(&job::output_prefix(&job_id));
        self.provider
            .push_metadata(&job_items(
                &self.config.startup_script_url,
                &self.config.jobs.uri(&job_key),
                &job.model_url,
                &output_uri,
            ))
            .await?;

        // 3) Trigger the (idempotent) start. Boot time dominates
        //    everything above, but the ordering still matters: the
        //    worker must never boot before its job is durable.
        self.controller.ensure_started().await?;
        tracing::info!(job_id = %job_id, "Instance start triggered, waiting for completion");

        // 4) Block until the worker drops the completion marker.
        self.wait_for_marker(&job_id).await?;

        // 5) Resolve image artifacts to signed URLs.
        let keys = self
            .store
            .list(&self.config.outputs, &job::output_prefix(&job_id))
            .await?;
        let images = image_artifacts(keys);
        if images.is_empty() {
            tracing::error!(job_id = %job_id, "Worker signalled completion without producing images");
            return Err(CoreError::EmptyResult);
        }

        let mut files = Vec::with_capacity(images.len());
        for key in &images {
            files.push(
                self.store
                    .presign_get(&self.config.outputs, key, self.config.signed_url_expiry)
                    .await?,
            );
        }

        tracing::info!(job_id = %job_id, count = files.len(), "Render job complete");
        Ok(SubmitOutcome { job_id, files })
    }

    /// Poll for the completion marker on the configured policy.
    ///
    /// The check only ever distinguishes exists/not-exists; transient
    /// storage errors are retried in place with bounded backoff instead
    /// of aborting a render that may be minutes from finishing.
    async fn wait_for_marker(&self, job_id: &str) -> Result<(), CoreError> {
        let marker = job::marker_key(job_id);
        let policy = self.config.completion_wait;

        let mut attempts = 0u32;
        let mut error_streak = 0u32;
        let mut error_delay = ERROR_RETRY_INITIAL;

        loop {
            match self.store.exists(&self.config.outputs, &marker).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    error_streak = 0;
                    error_delay = ERROR_RETRY_INITIAL;
                    attempts += 1;
                    if !policy.allows_attempt(attempts) {
                        return Err(CoreError::DeadlineExceeded(format!(
                            "completion marker for job {job_id}"
                        )));
                    }
                    tokio::time::sleep(policy.interval).await;
                }
                Err(err) => {
                    error_streak += 1;
                    if error_streak > ERROR_RETRY_LIMIT {
                        return Err(err);
                    }
                    tracing::warn!(
                        job_id = %job_id,
                        error = %err,
                        streak = error_streak,
                        "Completion poll hit a storage error, backing off"
                    );
                    tokio::time::sleep(error_delay).await;
                    error_delay = next_delay(error_delay, 2.0, ERROR_RETRY_MAX);
                }
            }
        }
    }
}
