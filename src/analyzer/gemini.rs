//! Generative Language API client
//!
//! # Request Flow
//!
//! 1. Start a resumable upload and send the video bytes
//! 2. Poll the uploaded file while it is `PROCESSING`; it must reach `ACTIVE`
//! 3. Generate content against the exercise schema; on a validation failure,
//!    generate again against the general schema
//! 4. Delete the uploaded file, whatever happened in between
//!
//! Steps 1 and 2 together are one attempt of the upload policy. Each generate
//! call runs under the inference policy, which also throttles every attempt.

use crate::analyzer::{load_prompt, parse_response, Analyzer, ResponseSchema};
use crate::config::Config;
use crate::http::{build_http_client, check_status, read_json};
use crate::model::{permalink, AnalysisResult, ExerciseAnalysis, GeneralInsights, Outcome};
use crate::retry::RetryPolicy;
use crate::{ErrorKind, Result, SiftError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const VIDEO_MIME_TYPE: &str = "video/mp4";

const STATE_PROCESSING: &str = "PROCESSING";
const STATE_ACTIVE: &str = "ACTIVE";

/// A file stored with the provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Vision-model analyzer backed by the Generative Language REST API
pub struct GeminiAnalyzer {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    prompt: String,
    permalink_base: String,
    poll_interval: Duration,
    upload_policy: RetryPolicy,
    inference_policy: RetryPolicy,
}

impl GeminiAnalyzer {
    /// Creates an analyzer from configuration and an explicit API key
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self> {
        let analyzer = &config.analyzer;
        Ok(Self {
            client: build_http_client(config)?,
            api_base: analyzer.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: analyzer.model.clone(),
            prompt: load_prompt(analyzer.prompt_path.as_deref())?,
            permalink_base: config.source.permalink_base.clone(),
            poll_interval: Duration::from_millis(analyzer.poll_interval_ms),
            upload_policy: RetryPolicy::upload(&config.retry.upload),
            inference_policy: RetryPolicy::inference(
                &config.retry.inference,
                Duration::from_millis(analyzer.request_delay_ms),
            ),
        })
    }

    fn keyed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.api_base, name)
    }

    /// Sends the video with the resumable upload protocol
    async fn upload_file(&self, video: &Path) -> Result<RemoteFile> {
        let bytes = tokio::fs::read(video).await?;
        let display_name = video
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        let start_url = format!("{}/upload/v1beta/files", self.api_base);
        let response = self
            .keyed(self.client.post(&start_url))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", VIDEO_MIME_TYPE)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| SiftError::http(&start_url, e))?;
        let response = check_status(&start_url, response).await?;

        let upload_url = response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| SiftError::Protocol {
                url: start_url.clone(),
                message: format!("missing {} header", UPLOAD_URL_HEADER),
            })?;

        let response = self
            .keyed(self.client.post(&upload_url))
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| SiftError::http(&upload_url, e))?;
        let response = check_status(&upload_url, response).await?;
        let uploaded: UploadResponse = read_json(&upload_url, response).await?;
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let url = self.file_url(name);
        let response = self
            .keyed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| SiftError::http(&url, e))?;
        let response = check_status(&url, response).await?;
        read_json(&url, response).await
    }

    /// Polls until the file leaves `PROCESSING`; anything but `ACTIVE` is an error
    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile> {
        while file.state == STATE_PROCESSING {
            tracing::debug!("Waiting for file {} to be processed...", file.name);
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state != STATE_ACTIVE {
            return Err(SiftError::ResourceState {
                name: file.name,
                state: file.state,
            });
        }
        Ok(file)
    }

    /// One upload attempt: send, then wait for the file to become usable
    ///
    /// A file that was created but never became usable is deleted before the
    /// error is returned, so a retry does not leave it behind.
    async fn upload_and_wait(&self, video: &Path) -> Result<RemoteFile> {
        tracing::info!("Uploading video to Gemini: {}", video.display());
        let file = self.upload_file(video).await?;
        let name = file.name.clone();

        match self.wait_until_active(file).await {
            Ok(file) => {
                tracing::info!("Video uploaded and ready: {}", file.name);
                Ok(file)
            }
            Err(e) => {
                self.delete_file(&name).await;
                Err(e)
            }
        }
    }

    async fn generate_once<S: ResponseSchema>(&self, file: &RemoteFile) -> Result<S> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let mime_type = file.mime_type.as_deref().unwrap_or(VIDEO_MIME_TYPE);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "file_data": { "mime_type": mime_type, "file_uri": file.uri } },
                    { "text": self.prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": S::schema()
            }
        });

        let response = self
            .keyed(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SiftError::http(&url, e))?;
        let response = check_status(&url, response).await?;
        let generated: GenerateResponse = read_json(&url, response).await?;
        parse_response(&generated.text())
    }

    async fn generate<S: ResponseSchema>(&self, file: &RemoteFile) -> Result<S> {
        let operation = format!("generate ({})", S::NAME);
        self.inference_policy
            .run(&operation, || self.generate_once::<S>(file))
            .await
    }

    /// Primary schema first; the fallback only when the primary does not validate
    async fn analyze_uploaded(&self, file: &RemoteFile, shortcode: &str) -> Result<AnalysisResult> {
        tracing::info!("Analyzing video with full schema: {}", shortcode);
        match self.generate::<ExerciseAnalysis>(file).await {
            Ok(analysis) => return Ok(analysis.into_result()),
            Err(e) if e.kind() == ErrorKind::Validation => {
                tracing::info!(
                    "Video {} doesn't match exercise schema, trying general insights: {}",
                    shortcode,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        let insights = self.generate::<GeneralInsights>(file).await?;
        Ok(insights.into_result())
    }

    /// Deletes an uploaded file; failures are logged and swallowed
    async fn delete_file(&self, name: &str) {
        let url = self.file_url(name);
        let result = match self.keyed(self.client.delete(&url)).send().await {
            Ok(response) => check_status(&url, response).await.map(|_| ()),
            Err(e) => Err(SiftError::http(&url, e)),
        };

        match result {
            Ok(()) => tracing::debug!("Deleted video from Gemini: {}", name),
            Err(e) => tracing::warn!("Failed to delete video from Gemini: {}", e),
        }
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, video: &Path, shortcode: &str) -> Outcome {
        let url = permalink(&self.permalink_base, shortcode);

        let file = match self
            .upload_policy
            .run("upload", || self.upload_and_wait(video))
            .await
        {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Failed to analyze video {}: {}", shortcode, e);
                return Outcome::failure(shortcode, url, e.to_string());
            }
        };

        let result = self.analyze_uploaded(&file, shortcode).await;
        self.delete_file(&file.name).await;

        match result {
            Ok(analysis) => Outcome::success(shortcode, url, analysis),
            Err(e) => {
                tracing::error!("Failed to analyze video {}: {}", shortcode, e);
                Outcome::failure(shortcode, url, e.to_string())
            }
        }
    }
}
