//! Image Generation Jobs
//!
//! This module drives a single external image-generation job through its
//! lifecycle: submit the prediction, poll its status at a fixed interval, and
//! stop on success, failure, or when the time budget runs out.
//!
//! Tools never see the errors produced here. They depend on [`ImageGenerator`],
//! whose `generate` collapses every failure into "no image" after logging it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::{Instant, sleep, timeout};
use tracing::{error, info, instrument, warn};

/// Endpoint used to create predictions.
pub const REPLICATE_PREDICTIONS_URL: &str = "https://api.replicate.com/v1/predictions";

/// FLUX schnell model version.
pub const FLUX_SCHNELL_VERSION: &str =
    "5599ed30703defd1d160a25a63321b4dec97101d98b4674bcc56e41f62f35637";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on any single HTTP exchange with the prediction service.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// --- Wire Types ---

/// Model input of a prediction.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PredictionInput {
    pub prompt: String,
    pub num_outputs: u32,
    pub aspect_ratio: String,
    pub output_format: String,
    pub output_quality: u8,
}

impl PredictionInput {
    /// One square webp image for the given prompt.
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_outputs: 1,
            aspect_ratio: "1:1".to_string(),
            output_format: "webp".to_string(),
            output_quality: 80,
        }
    }
}

#[derive(Serialize, Debug)]
struct CreatePredictionRequest<'a> {
    version: &'a str,
    input: &'a PredictionInput,
}

/// Status values reported by the prediction service.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionUrls {
    pub get: String,
}

/// A prediction as returned by both the create and the status calls.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    pub urls: PredictionUrls,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Prediction {
    /// First output reference, whether the model returned a list or a single URL.
    pub fn first_output(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::Array(items) => items.first()?.as_str().map(str::to_string),
            Value::String(url) => Some(url.clone()),
            _ => None,
        }
    }

    fn error_detail(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => "no error detail reported".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

// --- Errors ---

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Prediction request failed: {0}")]
    Transport(String),
    #[error("Prediction service rejected the job with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Prediction request timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Generation failed: {0}")]
    Failed(String),
    #[error("Generation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Status check failed: {0}")]
    Status(String),
    #[error("Generation succeeded without an output")]
    MissingOutput,
}

// --- Job State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Local view of one external job.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub status_url: String,
    pub status: JobStatus,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl GenerationJob {
    fn submitted(prediction: &Prediction) -> Self {
        Self {
            id: prediction.id.clone(),
            status_url: prediction.urls.get.clone(),
            status: JobStatus::Submitted,
            output: None,
            error: None,
        }
    }

    /// Folds a status response into the job. Terminal jobs are left untouched.
    fn apply(&mut self, prediction: &Prediction) {
        if self.status.is_terminal() {
            return;
        }
        match prediction.status {
            PredictionStatus::Succeeded => {
                self.status = JobStatus::Succeeded;
                self.output = prediction.first_output();
            }
            PredictionStatus::Failed | PredictionStatus::Canceled => {
                self.status = JobStatus::Failed;
                self.error = Some(prediction.error_detail());
            }
            PredictionStatus::Starting
            | PredictionStatus::Processing
            | PredictionStatus::Unknown => self.status = JobStatus::Running,
        }
    }
}

// --- Prediction API ---

/// Contract of the external prediction service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// Creates a prediction. Any non-success answer is a submission error.
    async fn create(&self, input: &PredictionInput) -> Result<Prediction, SubmissionError>;

    /// Reads the current state of a prediction from its status URL.
    async fn fetch(&self, status_url: &str) -> Result<Prediction, JobError>;
}

/// `PredictionApi` backed by Replicate's HTTP API.
pub struct ReplicateClient {
    http: reqwest::Client,
    token: String,
    endpoint: String,
}

impl ReplicateClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoint(token, REPLICATE_PREDICTIONS_URL)
    }

    pub fn with_endpoint(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "HTTP client builder failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            http,
            token: token.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PredictionApi for ReplicateClient {
    async fn create(&self, input: &PredictionInput) -> Result<Prediction, SubmissionError> {
        let body = CreatePredictionRequest {
            version: FLUX_SCHNELL_VERSION,
            input,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))
    }

    async fn fetch(&self, status_url: &str) -> Result<Prediction, JobError> {
        self.http
            .get(status_url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| JobError::Status(e.to_string()))?
            .json::<Prediction>()
            .await
            .map_err(|e| JobError::Status(e.to_string()))
    }
}

// --- Poller ---

/// Submits jobs and waits for them with a fixed interval and a hard time budget.
///
/// Time is read from the tokio clock, so tests can pause it and let the
/// runtime auto-advance through the sleeps.
pub struct JobPoller {
    api: Arc<dyn PredictionApi>,
    interval: Duration,
    timeout: Duration,
}

impl JobPoller {
    pub fn new(api: Arc<dyn PredictionApi>) -> Self {
        Self {
            api,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval;
        self.timeout = timeout;
        self
    }

    pub async fn submit(&self, prompt: &str) -> Result<GenerationJob, SubmissionError> {
        let input = PredictionInput::for_prompt(prompt);
        let prediction = timeout(self.timeout, self.api.create(&input))
            .await
            .map_err(|_| SubmissionError::TimedOut(self.timeout))??;
        info!(job_id = %prediction.id, "Generation job submitted");
        Ok(GenerationJob::submitted(&prediction))
    }

    /// Polls until the job reaches a terminal state or the budget is spent.
    ///
    /// A status call that has not answered when the budget runs out is
    /// abandoned, so the wait never outlives `timeout`.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn await_result(&self, job: &mut GenerationJob) -> Result<String, JobError> {
        let started = Instant::now();
        loop {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                job.status = JobStatus::TimedOut;
                return Err(JobError::TimedOut(self.timeout));
            }

            let fetched = match timeout(remaining, self.api.fetch(&job.status_url)).await {
                Ok(fetched) => fetched,
                Err(_) => {
                    job.status = JobStatus::TimedOut;
                    return Err(JobError::TimedOut(self.timeout));
                }
            };
            let prediction = match fetched {
                Ok(prediction) => prediction,
                Err(e) => {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                    return Err(e);
                }
            };
            job.apply(&prediction);

            match job.status {
                JobStatus::Succeeded => return job.output.clone().ok_or(JobError::MissingOutput),
                JobStatus::Failed => {
                    return Err(JobError::Failed(job.error.clone().unwrap_or_default()));
                }
                _ => sleep(self.interval).await,
            }
        }
    }
}

// --- Generators ---

/// What the tools depend on: a prompt in, maybe an image URL out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Option<String>;
}

#[async_trait]
impl ImageGenerator for JobPoller {
    async fn generate(&self, prompt: &str) -> Option<String> {
        let mut job = match self.submit(prompt).await {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "Image generation submission failed");
                return None;
            }
        };

        match self.await_result(&mut job).await {
            Ok(url) => {
                info!(job_id = %job.id, "Image generation succeeded");
                Some(url)
            }
            Err(e) => {
                warn!(job_id = %job.id, status = %job.status, error = %e, "Image generation did not produce an image");
                None
            }
        }
    }
}

/// Generator used when no credential is configured.
pub struct DisabledGenerator;

#[async_trait]
impl ImageGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Option<String> {
        warn!("REPLICATE_API_TOKEN not set, skipping image generation");
        None
    }
}
