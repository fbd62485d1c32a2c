// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Rate-limit aware access to the GitHub REST API.
///
/// Every request made by the tool funnels through [`RateLimitedClient`]. When
/// the API answers `403` with a `Retry-After` or `X-RateLimit-Reset` hint the
/// client postpones all further requests until that instant, so concurrent
/// workers sharing one client back off together instead of burning through
/// more forbidden responses. Connection failures are retried at a fixed pace.
use std::{
    future::Future,
    sync::{
        LazyLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Local};
use masterror::AppError;
use octocrab::Octocrab;
use regex::Regex;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;

static LINK_PATTERN: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>;\s*rel="([^"]+)""#,).expect("static link header pattern",)
},);

/// Raw HTTP answer as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ApiResponse
{
    /// URL that produced the response.
    pub url:     String,
    pub status:  u16,
    /// Header pairs with lowercased names.
    pub headers: Vec<(String, String,),>,
    pub body:    String,
}

impl ApiResponse
{
    pub fn new(url: impl Into<String,>, status: u16, body: impl Into<String,>,) -> Self
    {
        Self {
            url: url.into(), status, headers: Vec::new(), body: body.into(),
        }
    }

    /// Adds a header, normalizing the name to lowercase.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String,>,) -> Self
    {
        self.headers.push((name.to_ascii_lowercase(), value.into(),),);
        self
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str,) -> Option<&str,>
    {
        self.headers
            .iter()
            .find(|(key, _,)| key.eq_ignore_ascii_case(name,),)
            .map(|(_, value,)| value.as_str(),)
    }

    pub fn is_success(&self,) -> bool
    {
        (200..300).contains(&self.status,)
    }

    /// Target of the `rel="next"` entry of the `Link` header.
    pub fn next_link(&self,) -> Option<String,>
    {
        let header = self.header("link",)?;
        LINK_PATTERN
            .captures_iter(header,)
            .find(|captures| &captures[2] == "next",)
            .map(|captures| captures[1].to_owned(),)
    }

    /// Remaining request quota reported by the API.
    pub fn rate_limit_remaining(&self,) -> Option<u64,>
    {
        self.header("x-ratelimit-remaining",)?.trim().parse().ok()
    }

    /// Fails with [`Error::Remote`] unless the status is 2xx.
    ///
    /// # Errors
    ///
    /// The error carries the `message` field of the JSON body when present.
    pub fn ensure_success(self,) -> Result<Self, Error,>
    {
        if self.is_success() {
            return Ok(self,);
        }

        let message = serde_json::from_str::<serde_json::Value,>(&self.body,)
            .ok()
            .and_then(|value| value.get("message",).and_then(|m| m.as_str(),).map(str::to_owned,),)
            .unwrap_or_else(|| self.body.trim().to_owned(),);

        Err(Error::Remote {
            url: self.url, status: self.status, message,
        },)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned,>(&self,) -> Result<T, Error,>
    {
        Ok(serde_json::from_str(&self.body,)?,)
    }
}

/// Minimal HTTP seam used by [`RateLimitedClient`].
///
/// Implementations return every status code as a response; only failures to
/// obtain a response at all are reported as errors.
pub trait Transport: Send + Sync
{
    fn get(&self, url: &Url,) -> impl Future<Output = Result<ApiResponse, AppError,>,> + Send;
}

/// Pause between attempts after a connection failure.
///
/// The delay stays constant; only rate-limit hints lengthen a wait.
#[derive(Debug, Clone,)]
pub struct RetryConfig
{
    /// Delay before every retry in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig
{
    fn default() -> Self
    {
        Self {
            delay_ms: 1000,
        }
    }
}

/// Shortest postponement applied for a rate-limit reset, in milliseconds.
const MIN_RESET_WAIT_MS: u64 = 1000;

/// Client that serializes rate-limit waits across all callers.
///
/// The client is shared by reference (or behind an `Arc`) between workers;
/// all bookkeeping uses atomics so no lock is held across a request.
#[derive(Debug,)]
pub struct RateLimitedClient<T,>
{
    transport:    T,
    retry:        RetryConfig,
    /// Unix time in milliseconds before which no request may start.
    available_at: AtomicU64,
    /// Last wait target announced in the log.
    last_logged:  AtomicU64,
}

impl<T: Transport,> RateLimitedClient<T,>
{
    pub fn new(transport: T,) -> Self
    {
        let now = unix_millis();
        Self {
            transport,
            retry: RetryConfig::default(),
            available_at: AtomicU64::new(now,),
            last_logged: AtomicU64::new(now,),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig,) -> Self
    {
        self.retry = retry;
        self
    }

    pub fn transport(&self,) -> &T
    {
        &self.transport
    }

    /// Issues a GET request, waiting out rate limits and retrying dropped
    /// connections until a non-rate-limited response arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `url` is not an absolute URL. Every
    /// other outcome, including 4xx and 5xx statuses, is returned as a
    /// response for the caller to interpret.
    pub async fn get(&self, url: &str, query: &[(&str, &str,)],) -> Result<ApiResponse, Error,>
    {
        let mut target = Url::parse(url,)
            .map_err(|error| Error::validation(format!("invalid request URL '{url}': {error}"),),)?;
        if !query.is_empty() {
            target.query_pairs_mut().extend_pairs(query,);
        }

        loop {
            self.wait_until_available().await;

            let response = match self.transport.get(&target,).await {
                Ok(response,) => response,
                Err(error,) => {
                    warn!(
                        "request to {} failed: {}. Retrying in {}ms...",
                        target, error, self.retry.delay_ms
                    );
                    sleep(Duration::from_millis(self.retry.delay_ms,),).await;
                    continue;
                }
            };

            if response.status == 403 {
                if let Some(seconds,) =
                    response.header("retry-after",).and_then(|value| value.trim().parse::<u64>().ok(),)
                {
                    debug!("{} asked to retry after {}s", target, seconds);
                    self.postpone_until(unix_millis().saturating_add(seconds.saturating_mul(1000,),),);
                    continue;
                }
                if let Some(reset,) = response
                    .header("x-ratelimit-reset",)
                    .and_then(|value| value.trim().parse::<u64>().ok(),)
                {
                    debug!("{} hit the rate limit, quota resets at {}", target, reset);
                    let earliest = unix_millis().saturating_add(MIN_RESET_WAIT_MS,);
                    self.postpone_until(reset.saturating_mul(1000,).max(earliest,),);
                    continue;
                }
            }

            return Ok(response,);
        }
    }

    /// Moves the shared availability instant forward; never backwards.
    fn postpone_until(&self, millis: u64,)
    {
        self.available_at.fetch_max(millis, Ordering::SeqCst,);
    }

    async fn wait_until_available(&self,)
    {
        loop {
            let target = self.available_at.load(Ordering::SeqCst,);
            let now = unix_millis();
            if target <= now {
                return;
            }

            if self.last_logged.swap(target, Ordering::SeqCst,) != target {
                let resume: DateTime<Local,> = (UNIX_EPOCH + Duration::from_millis(target,)).into();
                info!("rate limited, sleeping until {}", resume.format("%H:%M:%S"));
            }

            sleep(Duration::from_millis(target - now,),).await;
        }
    }
}

fn unix_millis() -> u64
{
    SystemTime::now()
        .duration_since(UNIX_EPOCH,)
        .map(|elapsed| elapsed.as_millis() as u64,)
        .unwrap_or_default()
}

/// Production transport backed by an [`Octocrab`] instance.
#[derive(Debug, Clone,)]
pub struct OctocrabTransport
{
    octocrab: Octocrab,
}

impl OctocrabTransport
{
    /// Builds a transport for `api_url`, authenticating with `token` when one
    /// is available.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the client cannot be constructed.
    pub fn new(api_url: &str, token: Option<&str,>,) -> Result<Self, AppError,>
    {
        let mut builder = Octocrab::builder()
            .base_uri(api_url,)
            .map_err(|e| AppError::service(format!("invalid API base URL: {e}"),),)?;
        if let Some(token,) = token {
            builder = builder.personal_token(token,);
        }

        let octocrab = builder
            .build()
            .map_err(|e| AppError::service(format!("failed to build octocrab: {e}"),),)?;
        Ok(Self {
            octocrab,
        },)
    }
}

impl Transport for OctocrabTransport
{
    fn get(&self, url: &Url,) -> impl Future<Output = Result<ApiResponse, AppError,>,> + Send
    {
        let octocrab = self.octocrab.clone();
        let url = url.to_string();
        async move {
            let response = octocrab
                ._get(url.as_str(),)
                .await
                .map_err(|e| AppError::service(format!("GET {url}: {e}"),),)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value,)| {
                    value.to_str().ok().map(|value| (name.as_str().to_ascii_lowercase(), value.to_owned(),),)
                },)
                .collect();
            let body = octocrab
                .body_to_string(response,)
                .await
                .map_err(|e| AppError::service(format!("reading body of {url}: {e}"),),)?;

            Ok(ApiResponse {
                url,
                status,
                headers,
                body,
            },)
        }
    }
}
