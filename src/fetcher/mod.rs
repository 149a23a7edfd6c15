use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

mod parse;
pub mod types;

pub use parse::parse_feed;
pub use types::{ParsedFeed, ParsedFeedEntry};

pub const USER_AGENT: &str = "gator";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum FetchError {
    /// Request construction, connection or body read failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("fetch cancelled")]
    Cancelled,
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("malformed feed: {0}")]
    Parse(#[from] rss::Error),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Anything that can turn a feed url into a parsed feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str, ct: &CancellationToken) -> Result<ParsedFeed, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<Bytes, FetchError> {
        let resp = self.client.get(url).send().await.map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.bytes().await.map_err(FetchError::from_reqwest)
    }
}

#[async_trait]
impl FeedSource for HttpFetcher {
    async fn fetch(&self, url: &str, ct: &CancellationToken) -> Result<ParsedFeed, FetchError> {
        let body = tokio::select! {
            biased;
            _ = ct.cancelled() => return Err(FetchError::Cancelled),
            res = self.fetch_body(url) => res?,
        };
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss version="2.0"><channel><title>T</title><link>https://t.test</link><description>D</description>
<item><title>A &amp;amp; B</title><link>https://t.test/a</link><description>x</description><pubDate>Mon, 02 Jan 2006 15:04:05 GMT</pubDate></item>
</channel></rss>"#;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_parses_with_identifying_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let feed = fetcher()
            .fetch(&format!("{}/feed.xml", server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, "A & B");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&server.uri(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn html_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&server.uri(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let quick = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let err = quick.fetch(&server.uri(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_in_flight_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let ct = CancellationToken::new();
        let canceller = ct.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = fetcher().fetch(&server.uri(), &ct).await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let err = fetcher()
            .fetch("http://127.0.0.1:9/feed.xml", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout));
    }
}
