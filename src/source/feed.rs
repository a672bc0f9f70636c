//! HTTP media-feed client
//!
//! This module implements `ItemSource` over a JSON feed API:
//! - Login (or reuse of a saved session token)
//! - Profile lookup and cursor-paged post enumeration
//! - Single post lookup by shortcode
//! - Streaming video downloads
//!
//! Every request attempt, retries included, is paced with jitter. Lookups
//! and downloads run under the network retry policy; enumeration additionally survives rate limits with a
//! session-level pause and a restart from the first page.

use crate::config::{Config, LoginCredentials};
use crate::http::{build_http_client, check_status, read_json};
use crate::model::{permalink, WorkItem, WorkItemList};
use crate::retry::{Pacer, RetryPolicy, SessionBackoff, CONNECTION_KINDS};
use crate::source::{CredentialProvider, ItemSource};
use crate::{Result, SiftError};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::io::AsyncWriteExt;

const SIDECAR_TYPENAME: &str = "GraphSidecar";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session: String,
}

#[derive(Debug, Deserialize)]
struct ProfileInfo {
    username: String,
    #[serde(default)]
    media_count: u64,
}

#[derive(Debug, Deserialize)]
struct PostsPage {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SidecarNode {
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Post {
    shortcode: String,
    #[serde(default)]
    typename: String,
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    sidecar: Vec<SidecarNode>,
}

impl Post {
    /// Locator of the video to download: the first video child of a
    /// carousel, otherwise the post's own video
    fn video_locator(&self) -> Option<&str> {
        if self.typename == SIDECAR_TYPENAME {
            return self
                .sidecar
                .iter()
                .find(|node| node.is_video)
                .and_then(|node| node.video_url.as_deref());
        }
        if self.is_video {
            self.video_url.as_deref()
        } else {
            None
        }
    }

    fn into_work_item(self, permalink_base: &str) -> Option<WorkItem> {
        let video_url = self.video_locator()?.to_string();
        Some(WorkItem {
            url: permalink(permalink_base, &self.shortcode),
            shortcode: self.shortcode,
            video_url,
            caption: self.caption,
        })
    }
}

/// Feed API client
pub struct FeedClient {
    client: Client,
    base_url: String,
    permalink_base: String,
    session: Option<String>,
    request_pacer: Pacer,
    lookup_pacer: Pacer,
    backoff: SessionBackoff,
    policy: RetryPolicy,
}

impl FeedClient {
    /// Creates an unauthenticated client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.source.base_url.trim_end_matches('/').to_string(),
            permalink_base: config.source.permalink_base.clone(),
            session: None,
            request_pacer: Pacer::for_requests(&config.source),
            lookup_pacer: Pacer::for_lookups(&config.source),
            backoff: SessionBackoff::from_config(&config.source),
            policy: RetryPolicy::network(&config.retry.network),
        })
    }

    /// Uses an existing session token instead of logging in
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Reuses a saved session if the provider has one, otherwise logs in
    pub async fn authenticate(
        &mut self,
        provider: &dyn CredentialProvider,
        login: &LoginCredentials,
    ) -> Result<()> {
        if let Some(token) = provider.session_token(&login.username) {
            tracing::info!("Using existing session for {}", login.username);
            self.session = Some(token);
            return Ok(());
        }

        tracing::info!("No valid session found, logging in as {}...", login.username);
        self.login(login).await?;
        tracing::info!("Successfully logged in as {}", login.username);
        Ok(())
    }

    /// Exchanges username/password for a session token
    pub async fn login(&mut self, login: &LoginCredentials) -> Result<()> {
        let url = format!("{}/accounts/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &login.username,
                password: &login.password,
            })
            .send()
            .await
            .map_err(|e| SiftError::http(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiftError::Login(format!(
                "HTTP {} for user {}",
                status.as_u16(),
                login.username
            )));
        }

        let body: LoginResponse = read_json(&url, response).await?;
        self.session = Some(body.session);
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(token) => request.header(COOKIE, format!("sessionid={}", token)),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .authorized(self.client.get(url).query(query))
            .send()
            .await
            .map_err(|e| SiftError::http(url, e))?;
        let response = check_status(url, response).await?;
        read_json(url, response).await
    }

    async fn fetch_profile(&self, profile: &str) -> Result<ProfileInfo> {
        let url = format!("{}/profiles/{}", self.base_url, profile);
        self.get_json(&url, &[]).await
    }

    async fn fetch_page(&self, profile: &str, cursor: Option<&str>) -> Result<PostsPage> {
        let url = format!("{}/profiles/{}/posts", self.base_url, profile);
        match cursor {
            Some(after) => self.get_json(&url, &[("after", after)]).await,
            None => self.get_json(&url, &[]).await,
        }
    }

    async fn fetch_post(&self, shortcode: &str) -> Result<Post> {
        let url = format!("{}/posts/{}", self.base_url, shortcode);
        self.get_json(&url, &[]).await
    }

    async fn download_once(&self, locator: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| SiftError::http(locator, e))?;
        let mut response = check_status(locator, response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SiftError::http(locator, e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(())
    }
}

#[async_trait]
impl ItemSource for FeedClient {
    async fn enumerate(&self, profile: &str) -> Result<WorkItemList> {
        tracing::info!("Fetching profile: {}", profile);
        let info = self
            .policy
            .run("profile lookup", || async move {
                self.lookup_pacer.pause().await;
                self.fetch_profile(profile).await
            })
            .await?;
        tracing::info!("Profile {} has {} posts", info.username, info.media_count);

        let mut list = WorkItemList::new(profile);
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut rate_limit_attempts = 0u32;

        loop {
            self.request_pacer.pause().await;

            let page = match self.fetch_page(profile, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) if CONNECTION_KINDS.contains(&e.kind()) => {
                    tracing::warn!("Rate limit or connection error: {}", e);
                    if !self.backoff.wait(rate_limit_attempts).await {
                        tracing::warn!("Stopping early, collected {} videos", list.len());
                        break;
                    }
                    rate_limit_attempts += 1;
                    cursor = None;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut progressed = false;
            for post in page.posts {
                if !seen.insert(post.shortcode.clone()) {
                    continue;
                }
                progressed = true;

                let shortcode = post.shortcode.clone();
                match post.into_work_item(&self.permalink_base) {
                    Some(item) => {
                        if list.push_unique(item) {
                            tracing::info!("Found video {}: {}", list.len(), shortcode);
                        }
                    }
                    None => tracing::debug!("Skipping non-video: {}", shortcode),
                }
            }
            // A restart re-reads pages already seen; only new posts reset the budget.
            if progressed {
                rate_limit_attempts = 0;
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!("Total videos found: {}", list.len());
        Ok(list)
    }

    async fn fetch_one(&self, shortcode: &str) -> Result<Option<WorkItem>> {
        let post = self
            .policy
            .run("post lookup", || async move {
                self.lookup_pacer.pause().await;
                self.fetch_post(shortcode).await
            })
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch post {}: {}", shortcode, e);
                e
            })?;

        let item = post.into_work_item(&self.permalink_base);
        if item.is_none() {
            tracing::debug!("Post {} is not a video", shortcode);
        }
        Ok(item)
    }

    async fn download(&self, locator: &str, dest: &Path) -> Result<()> {
        tracing::info!("Downloading video to {}", dest.display());
        self.policy
            .run("download", || async move {
                self.request_pacer.pause().await;
                self.download_once(locator, dest).await
            })
            .await
    }
}
