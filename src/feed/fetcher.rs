use futures::StreamExt;

use super::parser::{parse_feed, FeedEntry, ParseOutcome};
use super::FetchError;
use crate::util::validate_url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Fetches a feed and parses its items.
///
/// Issues exactly one GET. There is no retry: transport failures, timeouts
/// configured on `client`, and non-2xx statuses are returned to the caller
/// as they happen.
///
/// # Returns
///
/// Every well-formed `<item>` as a [`FeedEntry`], in document order. A feed
/// with no items yields an empty `Vec`.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - `feed_url` is not an absolute http(s) URL
/// - [`FetchError::Network`] - DNS, connection, TLS or timeout failure
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Body exceeded 10MB
/// - [`FetchError::InvalidUtf8`] - Body is not UTF-8
/// - [`FetchError::Parse`] - Markup could not be walked
pub async fn fetch_feed(
    client: &reqwest::Client,
    feed_url: &str,
) -> Result<Vec<FeedEntry>, FetchError> {
    let url = validate_url(feed_url)?;

    tracing::info!(feed = %url, "Fetching feed");
    let response = client.get(url.as_str()).send().await.map_err(|e| {
        tracing::error!(feed = %url, error = %e, "Feed request failed");
        FetchError::Network(e)
    })?;

    if !response.status().is_success() {
        tracing::error!(feed = %url, status = %response.status(), "Feed returned error status");
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let text = String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)?;

    let ParseOutcome { entries, skipped } = parse_feed(&text)?;

    if skipped > 0 {
        tracing::warn!(
            feed = %url,
            skipped = skipped,
            "Feed items with missing fields skipped"
        );
    }
    tracing::info!(feed = %url, entries = entries.len(), "Feed parsed");

    Ok(entries)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item>
        <title>First</title>
        <category>Data</category>
        <content:encoded><![CDATA[<p>One</p>]]></content:encoded>
        <guid>https://e/1</guid>
    </item>
    <item>
        <title>Second</title>
        <content:encoded><![CDATA[<p>Two</p>]]></content:encoded>
        <guid>https://e/2</guid>
    </item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed/@jane"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/rss+xml"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let entries = fetch_feed(&client, &format!("{}/feed/@jane", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "First");
        assert_eq!(entries[0].body, "<p>One</p>");
        assert_eq!(entries[1].link, "https://e/2");
    }

    #[tokio::test]
    async fn test_404_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        match result.unwrap_err() {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let entries = fetch_feed(&client, &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_propagates() {
        // Bind then drop a plain listener so nothing answers on the port.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let client = reqwest::Client::new();
        let result = fetch_feed(&client, &format!("http://{addr}/feed")).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_request() {
        let client = reqwest::Client::new();
        let result = fetch_feed(&client, "not-a-valid-url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));

        let result = fetch_feed(&client, "ftp://example.com/feed").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0x3c]))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::InvalidUtf8)));
    }
}
