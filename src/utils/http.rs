// src/utils/http.rs

//! HTTP document fetching.
//!
//! The engine only sees the [`DocumentFetcher`] trait; [`HttpFetcher`] is the
//! reqwest-backed implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::HttpConfig;
use crate::error::{AppError, Result};

/// Outcome of fetching one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// The page body, with the final URL after redirects.
    Found { url: String, body: String },
    /// The site answered "no such page" (HTTP 404).
    NotFound,
}

impl Page {
    pub fn body(&self) -> Option<&str> {
        match self {
            Page::Found { body, .. } => Some(body),
            Page::NotFound => None,
        }
    }
}

/// Capability to fetch HTML documents.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch a document. A 404 is `Ok(Page::NotFound)`, other failures are errors.
    async fn fetch(&self, url: &str) -> Result<Page>;

    /// Issue a single request and report the HTTP status, whatever it is.
    async fn probe(&self, url: &str) -> Result<u16>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// reqwest-backed [`DocumentFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    /// Attach a header to every request (e.g. a site cookie).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::config(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::config(format!("invalid header value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("Not found: {}", url);
            return Ok(Page::NotFound);
        }

        let response = response.error_for_status()?;
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page::Found {
            url: final_url,
            body,
        })
    }

    async fn probe(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for pipeline tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct MockFetcher {
        pages: HashMap<String, String>,
        failures: Mutex<HashMap<String, usize>>,
        requests: Mutex<Vec<String>>,
        count: AtomicUsize,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        /// Make the next `times` fetches of `url` fail with a transport-like error.
        pub fn failing(self, url: &str, times: usize) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(url.to_string(), times);
            self
        }

        pub fn request_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Page> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(url.to_string());

            {
                let mut failures = self.failures.lock().unwrap();
                if let Some(remaining) = failures.get_mut(url) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(AppError::crawl(url, "connection reset"));
                    }
                }
            }

            Ok(match self.pages.get(url) {
                Some(body) => Page::Found {
                    url: url.to_string(),
                    body: body.clone(),
                },
                None => Page::NotFound,
            })
        }

        async fn probe(&self, url: &str) -> Result<u16> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(if self.pages.contains_key(url) { 200 } else { 404 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::from_config(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/s/frieren")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>ok</body></html>")
            .expect(1)
            .create_async()
            .await;

        let page = fetcher()
            .fetch(&format!("{}/s/frieren", server.url()))
            .await
            .unwrap();
        assert_eq!(page.body(), Some("<html><body>ok</body></html>"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/s/missing")
            .with_status(404)
            .create_async()
            .await;

        let page = fetcher()
            .fetch(&format!("{}/s/missing", server.url()))
            .await
            .unwrap();
        assert_eq!(page, Page::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/s/broken")
            .with_status(503)
            .create_async()
            .await;

        let result = fetcher()
            .fetch(&format!("{}/s/broken", server.url()))
            .await;
        assert!(matches!(result, Err(AppError::Http(_))));
    }

    #[tokio::test]
    async fn test_custom_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("cookie", "quality=1080")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let fetcher = fetcher().with_header("Cookie", "quality=1080").unwrap();
        fetcher.fetch(&format!("{}/", server.url())).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_reports_any_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/").with_status(403).create_async().await;

        let status = fetcher().probe(&format!("{}/", server.url())).await.unwrap();
        assert_eq!(status, 403);
    }
}
