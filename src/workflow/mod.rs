//! Processing Workflow State Machine
//!
//! Drives one run of the upload → confirm → process → results sequence:
//!
//! ```text
//! Idle -> Uploading -> AwaitingConfirmation -> Processing -> Completed
//!            |                 |                   |
//!            v                 v                   v
//!          Idle (error)      Idle (cancel)       Failed
//! ```
//!
//! Terminal states are never revisited; a new upload starts a fresh run.
//! While processing, a status poll runs on a side channel purely for
//! progress display; the extraction call's own resolution is authoritative
//! and the poll is aborted as soon as it settles. There are no automatic
//! retries anywhere; every failure waits for explicit user action.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::types::{JobStatus, ProcessResult, UploadDescriptor};
use crate::api::ApiClient;
use crate::config::WorkflowConfig;
use crate::error::{ClientError, Result};

/// Workflow phase for one run
#[derive(Debug, Clone)]
pub enum WorkflowState {
    /// No file chosen; entry point
    Idle,
    /// Upload in flight
    Uploading,
    /// Quota descriptor shown; waiting for the user to confirm or cancel
    AwaitingConfirmation(UploadDescriptor),
    /// Extraction in flight, status poll running alongside
    Processing,
    /// Terminal: aggregated output ready for hand-off
    Completed(ProcessOutput),
    /// Terminal: error recorded in `last_error`
    Failed,
}

/// Aggregated output of a completed run: the extraction result plus the
/// JSON content fetched for each table that produced a JSON artifact,
/// keyed by table index.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub result: ProcessResult,
    pub table_json: BTreeMap<usize, serde_json::Value>,
}

/// Page limit to request for a run.
///
/// A promotional entitlement lifts the limit to the full page count;
/// otherwise the run is capped at `min(pages_total, limit_left)`. Only when
/// the descriptor carries no usable figure at all does the configured
/// default apply. A zero page count with known quota requests zero pages.
pub fn pages_limit(descriptor: &UploadDescriptor, default_limit: u32) -> u32 {
    let total = descriptor.pages_total.unwrap_or(0);
    let left = descriptor.limit_left.unwrap_or(0);

    if total == 0 && left == 0 {
        return default_limit;
    }
    if descriptor.has_active_promo {
        total
    } else {
        total.min(left)
    }
}

/// One workflow instance; owns its state exclusively
pub struct Workflow {
    client: ApiClient,
    options: WorkflowConfig,
    run_id: Uuid,
    filename: Option<String>,
    state: WorkflowState,
    last_error: Option<String>,
    status: watch::Sender<Option<JobStatus>>,
}

impl Workflow {
    pub fn new(client: ApiClient, options: WorkflowConfig) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            client,
            options,
            run_id: Uuid::new_v4(),
            filename: None,
            state: WorkflowState::Idle,
            last_error: None,
            status,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// File name of the current run's upload, if any
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Most recent user-visible error for this instance
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Observe advisory status-poll updates for the current run
    pub fn status_updates(&self) -> watch::Receiver<Option<JobStatus>> {
        self.status.subscribe()
    }

    /// Discard all run state and return to `Idle` under a fresh run id.
    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
        self.last_error = None;
        self.filename = None;
        self.run_id = Uuid::new_v4();
        self.status.send_replace(None);
    }

    /// Submit one user-selected file. Issues exactly one upload request; on
    /// success the quota descriptor is held for confirmation, on failure the
    /// backend's message is recorded and the machine returns to `Idle`.
    pub async fn submit_upload(&mut self, path: &Path) -> Result<UploadDescriptor> {
        match self.state {
            WorkflowState::Uploading | WorkflowState::Processing => {
                return Err(ClientError::InvalidState("Idle"));
            }
            // Selecting a new file supersedes any previous run.
            _ => self.reset(),
        }

        if let Err(err) = validate_selection(path) {
            self.last_error = Some(err.user_message());
            return Err(err);
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| ClientError::Validation("Please select a PDF file".to_string()))?;

        self.state = WorkflowState::Uploading;
        tracing::info!(run_id = %self.run_id, file = %file_name, "uploading");

        match self.client.upload_pdf(path).await {
            Ok(descriptor) => {
                tracing::info!(
                    run_id = %self.run_id,
                    pages_total = descriptor.pages_total,
                    limit_left = descriptor.limit_left,
                    promo = descriptor.has_active_promo,
                    "upload accepted"
                );
                self.filename = Some(file_name);
                self.last_error = None;
                self.state = WorkflowState::AwaitingConfirmation(descriptor.clone());
                Ok(descriptor)
            }
            Err(err) => {
                tracing::warn!(run_id = %self.run_id, error = %err, "upload failed");
                self.last_error = Some(err.user_message());
                self.state = WorkflowState::Idle;
                Err(err)
            }
        }
    }

    /// Abandon a pending confirmation, discarding the quota descriptor.
    pub fn cancel(&mut self) {
        if matches!(self.state, WorkflowState::AwaitingConfirmation(_)) {
            tracing::debug!(run_id = %self.run_id, "confirmation cancelled");
            self.reset();
        }
    }

    /// Page limit that `confirm` would request, for display before the user
    /// commits. Only valid while awaiting confirmation.
    pub fn pending_pages_limit(&self) -> Option<u32> {
        match &self.state {
            WorkflowState::AwaitingConfirmation(descriptor) => {
                Some(pages_limit(descriptor, self.options.default_pages_limit))
            }
            _ => None,
        }
    }

    /// Run the extraction for the confirmed upload. The status poll runs
    /// alongside and is aborted once the main call settles; dropping the
    /// returned future cancels both. On success every table's JSON artifact
    /// is fetched in index order before the machine completes.
    pub async fn confirm(&mut self) -> Result<()> {
        let descriptor = match &self.state {
            WorkflowState::AwaitingConfirmation(descriptor) => descriptor.clone(),
            _ => return Err(ClientError::InvalidState("AwaitingConfirmation")),
        };
        let filename = self
            .filename
            .clone()
            .ok_or(ClientError::InvalidState("AwaitingConfirmation"))?;
        let limit = pages_limit(&descriptor, self.options.default_pages_limit);

        self.last_error = None;
        self.state = WorkflowState::Processing;
        tracing::info!(run_id = %self.run_id, file = %filename, pages_limit = limit, "processing");

        let poll = self.spawn_status_poll(filename.clone());
        let outcome = self.run_extraction(&filename, limit).await;
        drop(poll);

        match outcome {
            Ok(output) => {
                tracing::info!(
                    run_id = %self.run_id,
                    tables = output.result.total_tables,
                    "processing completed"
                );
                self.state = WorkflowState::Completed(output);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(run_id = %self.run_id, error = %err, "processing failed");
                self.last_error = Some(err.user_message());
                self.state = WorkflowState::Failed;
                Err(err)
            }
        }
    }

    /// Move the completed output out for hand-off to a results view,
    /// leaving a fresh machine behind. `None` when there is nothing to hand
    /// off, in which case the caller goes back to the upload entry point.
    pub fn take_output(&mut self) -> Option<ProcessOutput> {
        match std::mem::replace(&mut self.state, WorkflowState::Idle) {
            WorkflowState::Completed(output) => {
                self.reset();
                Some(output)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    async fn run_extraction(&self, filename: &str, limit: u32) -> Result<ProcessOutput> {
        let result = self.client.process(filename, limit).await?;

        // Fetch JSON content per table, in index order. The fetches are
        // independent; only the index -> content mapping matters.
        let mut table_json = BTreeMap::new();
        for (index, table) in result.tables.iter().enumerate() {
            if let Some(json_file) = &table.json_file {
                let value = self.client.download_json(json_file).await?;
                table_json.insert(index, value);
            }
        }

        Ok(ProcessOutput { result, table_json })
    }

    fn spawn_status_poll(&self, filename: String) -> PollGuard {
        let client = self.client.clone();
        let status = self.status.clone();
        let interval = Duration::from_millis(self.options.poll_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match client.process_status(&filename).await {
                    Ok(report) => {
                        tracing::debug!(file = %filename, status = %report.status, "job status");
                        status.send_replace(Some(report));
                    }
                    Err(err) => {
                        // Advisory channel only; a failed poll changes nothing.
                        tracing::debug!(file = %filename, error = %err, "status poll failed");
                    }
                }
            }
        });
        PollGuard { handle }
    }
}

/// Aborts the status-poll loop when the processing call settles or the
/// workflow is torn down, so no timer is leaked.
struct PollGuard {
    handle: JoinHandle<()>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn validate_selection(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ClientError::Validation(
            "Please select a PDF file".to_string(),
        ));
    }
    let is_pdf = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(ClientError::Validation(
            "Please select a PDF file".to_string(),
        ));
    }
    Ok(())
}
