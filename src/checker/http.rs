// src/checker/http.rs
// =============================================================================
// This module checks whether remote URLs are reachable.
//
// Protocol per URL:
// - HEAD request first (lightweight, no body download)
// - Falls back to GET with `Range: bytes=0-0` if HEAD fails,
//   with a longer timeout when the HEAD attempt timed out
// - 403 counts as reachable (bot blocking, not breakage)
// - 429 is tagged rate-limited and deferred to the retry pass
//
// The probe is a capability trait so validation, batching and the retry
// driver can be exercised against fakes without touching the network.
// =============================================================================

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use reqwest::{Client, Method, StatusCode};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    Broken { reason: String, rate_limited: bool },
}

impl ProbeOutcome {
    pub fn broken(reason: impl Into<String>) -> Self {
        ProbeOutcome::Broken {
            reason: reason.into(),
            rate_limited: false,
        }
    }

    pub fn rate_limited(reason: impl Into<String>) -> Self {
        ProbeOutcome::Broken {
            reason: reason.into(),
            rate_limited: true,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok)
    }
}

/// Capability for checking a remote URL. The real implementation talks
/// HTTP; tests substitute fakes.
pub trait HttpProbe {
    async fn check_url(&self, url: &str) -> ProbeOutcome;
}

/// Result of a single request attempt, before protocol interpretation.
#[derive(Debug, Clone)]
struct FetchResult {
    ok: bool,
    status: Option<u16>,
    error: Option<String>,
    timed_out: bool,
}

/// reqwest-backed probe with browser-like headers.
pub struct WebProbe {
    client: Client,
}

impl WebProbe {
    pub fn new() -> anyhow::Result<Self> {
        // Browser-like headers to reduce anti-bot blocking.
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );
        headers.insert(
            "Accept",
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch(
        &self,
        url: &str,
        method: Method,
        include_range: bool,
        timeout: Duration,
    ) -> FetchResult {
        let mut request = self.client.request(method, url).timeout(timeout);
        if include_range {
            request = request.header(RANGE, "bytes=0-0");
        }

        match request.send().await {
            Ok(response) => FetchResult {
                ok: response.status().is_success(),
                status: Some(response.status().as_u16()),
                error: None,
                timed_out: false,
            },
            Err(e) if e.is_timeout() => FetchResult {
                ok: false,
                status: None,
                error: Some(format!("Timeout ({}s)", timeout.as_secs())),
                timed_out: true,
            },
            Err(e) => FetchResult {
                ok: false,
                status: None,
                error: Some(e.to_string()),
                timed_out: false,
            },
        }
    }
}

impl HttpProbe for WebProbe {
    async fn check_url(&self, url: &str) -> ProbeOutcome {
        let head = self
            .fetch(url, Method::HEAD, false, REQUEST_TIMEOUT)
            .await;

        // Many sites refuse HEAD or block non-browsers with 403 while the
        // page itself is fine; treat both as reachable.
        if head.status == Some(StatusCode::FORBIDDEN.as_u16()) || head.ok {
            return ProbeOutcome::Ok;
        }

        let get_timeout = if head.timed_out {
            RETRY_TIMEOUT
        } else {
            REQUEST_TIMEOUT
        };
        let get = self.fetch(url, Method::GET, true, get_timeout).await;

        interpret(&head, &get)
    }
}

/// Folds the two attempts into one outcome. Kept free of I/O so the status
/// precedence rules are testable without a network.
fn interpret(head: &FetchResult, get: &FetchResult) -> ProbeOutcome {
    if get.status == Some(403) {
        return ProbeOutcome::Ok;
    }

    // 206/416 are expected answers to the 0-0 range request.
    if get.ok || get.status == Some(206) || get.status == Some(416) {
        return ProbeOutcome::Ok;
    }

    if get.status == Some(429) || head.status == Some(429) {
        let status = get.status.or(head.status).unwrap_or(429);
        return ProbeOutcome::rate_limited(format!("HTTP {}", status));
    }

    if let Some(error) = &get.error {
        return ProbeOutcome::broken(error.clone());
    }
    if let Some(status) = get.status {
        return ProbeOutcome::broken(format!("HTTP {}", status));
    }
    if let Some(error) = &head.error {
        return ProbeOutcome::broken(error.clone());
    }
    if let Some(status) = head.status {
        return ProbeOutcome::broken(format!("HTTP {}", status));
    }

    ProbeOutcome::broken("Unknown error")
}
