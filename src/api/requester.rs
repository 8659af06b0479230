//! Authenticated HTTP exchange against the GitHub API
//!
//! Every request carries the access token, an explicit content type, the v3
//! accept header and an explicit `Content-Length`, so file bodies stream from
//! disk instead of being buffered. In debug mode the full request and response
//! are written to the `github_release::wire` log target.
//!
//! The configured timeout bounds connection setup and in-memory exchanges as a
//! whole. Streamed uploads are only aborted once no bytes have moved for that
//! long, so a large asset may take longer than the timeout to transfer.

use crate::core::config::PublisherConfig;
use crate::core::error::{PublishError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, Request, StatusCode};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Instant;
use tokio_util::io::ReaderStream;

/// Accept header pinning the REST API version
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Log target for request/response dumps
pub const WIRE_TARGET: &str = "github_release::wire";

const USER_AGENT: &str = concat!("github-release/", env!("CARGO_PKG_VERSION"));

/// Body of an outgoing request
#[derive(Debug)]
pub enum RequestBody {
    /// In-memory payload (JSON documents, empty bodies)
    Bytes(Vec<u8>),
    /// File streamed from disk; `len` is sent as `Content-Length`
    File { file: File, len: u64 },
}

impl RequestBody {
    pub fn empty() -> Self {
        RequestBody::Bytes(Vec::new())
    }

    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Bytes(bytes) => bytes.len() as u64,
            RequestBody::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Performs single authenticated requests against the hosting API
pub struct Requester {
    client: reqwest::Client,
    config: Arc<PublisherConfig>,
}

impl Requester {
    /// Build a requester; the configured timeout also bounds connection setup
    pub fn new(config: Arc<PublisherConfig>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| PublishError::from_transport(&config.api_base, e))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Send one request and return the response body
    ///
    /// Any status other than `200 OK` or `201 Created` is returned as
    /// [`PublishError::ApiError`] with the status line and body verbatim.
    /// In-memory bodies must complete within the configured timeout; file
    /// bodies fail with [`PublishError::TimeoutError`] once the transfer has
    /// been idle that long.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        content_type: &str,
        body: RequestBody,
    ) -> Result<Vec<u8>> {
        let content_length = body.len();
        let debug = self.config.debug;
        let limit = self.config.request_timeout;

        let (body, progress) = match body {
            RequestBody::Bytes(bytes) => (reqwest::Body::from(bytes), None),
            RequestBody::File { file, .. } => {
                let progress = TransferProgress::new();
                let reader = ProgressReader::new(file, url.to_string(), progress.clone(), debug);
                (
                    reqwest::Body::wrap_stream(ReaderStream::new(reader)),
                    Some(progress),
                )
            }
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.config.token.authorization_header())
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(CONTENT_LENGTH, content_length)
            .body(body);
        if let (Some(limit), None) = (limit, &progress) {
            builder = builder.timeout(limit);
        }
        let request = builder
            .build()
            .map_err(|e| PublishError::from_transport(url, e))?;

        if debug {
            log::debug!(target: WIRE_TARGET, "================ REQUEST DUMP ==================");
            log::debug!(target: WIRE_TARGET, "{}", self.dump_request(&request, content_length));
        }

        let exchange = self.exchange(request, url, progress.as_ref());
        let (status, bytes) = match (limit, &progress) {
            (Some(limit), Some(progress)) => tokio::select! {
                result = exchange => result?,
                _ = progress.stalled(limit) => {
                    log::warn!("no progress on {} for {}s, giving up", url, limit.as_secs_f64());
                    return Err(PublishError::TimeoutError {
                        url: url.to_string(),
                    });
                }
            },
            _ => exchange.await?,
        };

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(PublishError::ApiError {
                status: status.to_string(),
                code: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes)
    }

    /// Send `request` and read the whole response
    async fn exchange(
        &self,
        request: Request,
        url: &str,
        progress: Option<&TransferProgress>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let debug = self.config.debug;

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                if debug {
                    log::debug!(target: WIRE_TARGET, "================ RESPONSE DUMP ==================");
                    log::debug!(target: WIRE_TARGET, "no response: {}", e);
                }
                return Err(PublishError::from_transport(url, e));
            }
        };
        if let Some(progress) = progress {
            progress.touch();
        }

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PublishError::from_transport(url, e))?;

        if debug {
            log::debug!(target: WIRE_TARGET, "================ RESPONSE DUMP ==================");
            log::debug!(
                target: WIRE_TARGET,
                "{}",
                self.dump_response(status, version, &headers, &bytes)
            );
        }

        Ok((status, bytes.to_vec()))
    }

    fn dump_request(&self, request: &Request, content_length: u64) -> String {
        let url = request.url();
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut dump = format!("{} {} {:?}\r\n", request.method(), target, request.version());
        if let Some(host) = url.host_str() {
            match url.port() {
                Some(port) => dump.push_str(&format!("host: {}:{}\r\n", host, port)),
                None => dump.push_str(&format!("host: {}\r\n", host)),
            }
        }
        dump.push_str(&format_headers(request.headers()));
        dump.push_str("\r\n");

        match request.body().and_then(|body| body.as_bytes()) {
            Some(bytes) => dump.push_str(&String::from_utf8_lossy(bytes)),
            None => dump.push_str(&format!("<{} bytes streamed from file>", content_length)),
        }

        self.config.token.mask_tokens_in_string(&dump)
    }

    fn dump_response(
        &self,
        status: StatusCode,
        version: reqwest::Version,
        headers: &HeaderMap,
        body: &[u8],
    ) -> String {
        let mut dump = format!("{:?} {}\r\n", version, status);
        dump.push_str(&format_headers(headers));
        dump.push_str("\r\n");
        dump.push_str(&String::from_utf8_lossy(body));

        self.config.token.mask_tokens_in_string(&dump)
    }
}

fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            )
        })
        .collect()
}

/// Last moment bytes moved on a streamed transfer
#[derive(Clone)]
struct TransferProgress {
    origin: Instant,
    last_ms: Arc<AtomicU64>,
}

impl TransferProgress {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    fn touch(&self) {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(elapsed, Ordering::Relaxed);
    }

    fn last_activity(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_ms.load(Ordering::Relaxed))
    }

    /// Resolves once nothing has moved for `limit`
    async fn stalled(&self, limit: Duration) {
        loop {
            let deadline = self.last_activity() + limit;
            if Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep_until(deadline).await;
        }
    }
}

/// Reader feeding a streamed body; records progress and traces chunks in debug mode
struct ProgressReader<R> {
    inner: R,
    url: String,
    sent: u64,
    progress: TransferProgress,
    trace: bool,
}

impl<R> ProgressReader<R> {
    fn new(inner: R, url: String, progress: TransferProgress, trace: bool) -> Self {
        Self {
            inner,
            url,
            sent: 0,
            progress,
            trace,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &poll {
            let chunk = &buf.filled()[before..];
            if !chunk.is_empty() {
                this.sent += chunk.len() as u64;
                this.progress.touch();
                if this.trace {
                    log::debug!(
                        target: WIRE_TARGET,
                        "body chunk for {} ({} bytes, {} sent):\n{}",
                        this.url,
                        chunk.len(),
                        this.sent,
                        String::from_utf8_lossy(chunk)
                    );
                }
            }
        }

        poll
    }
}
