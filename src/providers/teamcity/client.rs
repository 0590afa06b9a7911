use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::auth::Token;
use crate::error::{CollectorError, Result};

/// Status and unparsed body of one TeamCity response.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body decoded for log and error messages, with invalid bytes replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Thin HTTP client for the investigation collector controllers.
///
/// Every call is sent with the configured bearer token and bounded by the
/// client-wide timeout. Timeouts and connection failures surface as
/// [`CollectorError::Network`]; non-success statuses are returned to the caller
/// untouched so each stage can apply its own policy.
pub struct TeamCityClient {
    client: Client,
    base_url: Url,
    token: Option<Token>,
}

impl TeamCityClient {
    pub fn new(base_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("assign-collector/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| CollectorError::Config(format!("Invalid base URL: {e}")))?;

        // Url::join replaces the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// URL of a controller relative to the server base.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| CollectorError::Config(format!("Invalid endpoint {endpoint}: {e}")))
    }

    /// Resolves a server-supplied `nextHref` against the server base.
    pub fn resolve_href(&self, href: &str) -> Result<Url> {
        self.base_url
            .join(href)
            .map_err(|e| CollectorError::Config(format!("Invalid next page reference {href}: {e}")))
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    pub async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<RawResponse> {
        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url).query(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?.to_vec();

        debug!("Received {} bytes with status {status}", body.len());

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: &str, token: Option<&str>) -> TeamCityClient {
        TeamCityClient::new(url, token.map(Token::from), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = TeamCityClient::new("not a url", None, Duration::from_secs(1));
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let client = client("https://ci.example.com/teamcity", None);
        let url = client.endpoint_url("/assignInfoCollector.html").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ci.example.com/teamcity/assignInfoCollector.html"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute_href() {
        let client = client("https://ci.example.com/teamcity/", None);

        let relative = client.resolve_href("ids.html?page=2").unwrap();
        assert_eq!(
            relative.as_str(),
            "https://ci.example.com/teamcity/ids.html?page=2"
        );

        let absolute = client
            .resolve_href("https://other.example.com/ids.html?page=3")
            .unwrap();
        assert_eq!(absolute.as_str(), "https://other.example.com/ids.html?page=3");
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/assignInfoCollector.html")
            .match_header("authorization", "Bearer secret")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("projectExternalId".into(), "Backend".into()),
                Matcher::UrlEncoded("ids".into(), "1_2,3_4".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let url = client.endpoint_url("assignInfoCollector.html").unwrap();
        let response = client
            .get(url, &[("projectExternalId", "Backend"), ("ids", "1_2,3_4")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
        assert_eq!(response.body, b"[]");
    }

    #[tokio::test]
    async fn test_get_without_token_sends_no_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ids.html")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[1]")
            .create_async()
            .await;

        let client = client(&server.url(), None);
        let url = client.endpoint_url("ids.html").unwrap();
        client.get(url, &[]).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_returned_with_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/assignInfoCollector.html")
            .with_status(403)
            .with_body("Access denied")
            .create_async()
            .await;

        let client = client(&server.url(), Some("secret"));
        let url = client.endpoint_url("assignInfoCollector.html").unwrap();
        let response = client.get(url, &[]).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body, b"Access denied");
        assert_eq!(response.body_text(), "Access denied");
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let client = client("http://127.0.0.1:1", None);
        let url = client.endpoint_url("ids.html").unwrap();
        let result = client.get(url, &[]).await;

        assert!(matches!(result, Err(CollectorError::Network(_))));
    }
}
