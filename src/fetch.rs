use anyhow::{anyhow, Context, Result};
use log::warn;
use rand::Rng;
use reqwest::blocking::Client;
use std::thread;
use std::time::Duration;

/// Browser family a spoofed User-Agent claims to be. The Referer header
/// must agree with it; a Chrome agent arriving from a Firefox-style search
/// URL is a recognizable signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    Chrome,
    Safari,
    Firefox,
}

const USER_AGENTS: &[(&str, BrowserFamily)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        BrowserFamily::Chrome,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Safari/605.1.15",
        BrowserFamily::Safari,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
        BrowserFamily::Firefox,
    ),
];

/// Supplies a uniformly random (user-agent, family) pair per request.
pub struct UserAgentRotator;

impl UserAgentRotator {
    pub fn next(&self) -> (&'static str, BrowserFamily) {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }
}

/// Search-engine referer matching the claimed browser, with the search
/// keywords embedded so the visit looks like a click-through.
pub fn referer_for(family: BrowserFamily, keywords: &str) -> String {
    let encoded = urlencoding::encode(keywords);
    match family {
        BrowserFamily::Chrome => format!("https://www.google.com/search?q={encoded}"),
        BrowserFamily::Safari => format!(
            "https://www.google.com/search?client=safari&rls=en&q={encoded}&ie=UTF-8&oe=UTF-8"
        ),
        BrowserFamily::Firefox => {
            format!("https://www.google.com/search?client=firefox-b-d&q={encoded}")
        }
    }
}

/// Evasion timing and retry policy. The delay ranges exist to break up the
/// request cadence; tests set them to (0.0, 0.0).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Jitter slept before every request, seconds, half-open range.
    pub request_delay: (f64, f64),
    /// Delay between successive result pages, seconds, half-open range.
    pub page_delay: (f64, f64),
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay: (1.0, 3.0),
            page_delay: (2.0, 5.0),
            max_retries: 3,
            backoff_factor: 0.1,
            timeout_secs: 30,
        }
    }
}

/// Sleep a uniformly random duration drawn from `range`.
pub fn sleep_range(range: (f64, f64)) {
    let (lo, hi) = range;
    let secs = if hi > lo {
        rand::thread_rng().gen_range(lo..hi)
    } else {
        lo
    };
    if secs > 0.0 {
        thread::sleep(Duration::from_secs_f64(secs));
    }
}

/// The seam between pagination and the network. Production uses
/// `FetchClient`; tests script their own pages.
pub trait PageFetcher {
    fn fetch(&self, url: &str, keywords: &str) -> Result<String>;
}

pub struct FetchClient {
    client: Client,
    rotator: UserAgentRotator,
    config: FetchConfig,
}

/// Statuses worth retrying; anything else non-2xx fails immediately.
const RETRYABLE_STATUS: &[u16] = &[429, 500, 502, 503, 504];

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rotator: UserAgentRotator,
            config,
        })
    }
}

impl PageFetcher for FetchClient {
    fn fetch(&self, url: &str, keywords: &str) -> Result<String> {
        let (user_agent, family) = self.rotator.next();
        let referer = referer_for(family, keywords);

        sleep_range(self.config.request_delay);

        let mut attempt = 0;
        loop {
            let result = self
                .client
                .get(url)
                .header("User-Agent", user_agent)
                .header("Accept-Language", "en-US,en;q=0.9")
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
                )
                .header("DNT", "1")
                .header("Referer", &referer)
                .header("Connection", "keep-alive")
                .header("Upgrade-Insecure-Requests", "1")
                .send();

            let retryable = match &result {
                Ok(response) => RETRYABLE_STATUS.contains(&response.status().as_u16()),
                Err(_) => true,
            };

            if retryable && attempt < self.config.max_retries {
                let backoff = backoff_delay(self.config.backoff_factor, attempt);
                warn!(
                    "Request to {url} failed, retrying in {backoff:.1}s ({}/{})",
                    attempt + 1,
                    self.config.max_retries
                );
                thread::sleep(Duration::from_secs_f64(backoff));
                attempt += 1;
                continue;
            }

            let response = result.with_context(|| format!("Request to {url} failed"))?;
            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("Request to {url} returned status {status}"));
            }

            let body = response
                .bytes()
                .with_context(|| format!("Failed to read response body from {url}"))?;
            return Ok(decode_body(&body));
        }
    }
}

fn backoff_delay(factor: f64, attempt: u32) -> f64 {
    factor * f64::from(1u32 << attempt)
}

/// Decode as UTF-8, falling back to Latin-1. Every byte sequence is valid
/// Latin-1, so a transport success always yields a string.
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
