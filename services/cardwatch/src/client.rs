//! Backend API client: swagger proxy and diff-log reads
//!
//! Responses are treated as opaque structured values; no schema validation is
//! performed client-side.

use std::sync::Arc;

use crate::error::FetchError;
use crate::io::{HttpClient, HttpResponse};

/// Cap on body excerpts carried in classified fetch errors
const SNIPPET_MAX_CHARS: usize = 200;

/// Client for the backend swagger proxy and diff-log endpoints
pub struct BackendClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Created BackendClient for {}", base_url);
        Self { base_url, http }
    }

    /// Fetch a Swagger/OpenAPI document for a target URL via the backend proxy
    pub async fn fetch_swagger(
        &self,
        target_url: &str,
    ) -> std::result::Result<serde_json::Value, FetchError> {
        let url = format!("{}/api/v1/swagger", self.base_url);
        let body = serde_json::json!({ "url": target_url });
        tracing::debug!("Fetching swagger document for {} via {}", target_url, url);

        let response = self
            .http
            .post_json(&url, &body)
            .await
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;
        classify(response)
    }

    /// Fetch a page of diff-log summaries for a service
    pub async fn fetch_diff_page(
        &self,
        service_name: &str,
        page: u32,
        size: u32,
    ) -> std::result::Result<serde_json::Value, FetchError> {
        let url = format!(
            "{}/api/v1/diff/service/{}?page={}&size={}",
            self.base_url, service_name, page, size
        );
        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;
        classify(response)
    }

    /// Fetch the full added/removed/updated collections for one diff log
    pub async fn fetch_diff_detail(
        &self,
        diff_log_id: &str,
    ) -> std::result::Result<serde_json::Value, FetchError> {
        let url = format!("{}/api/v1/diff/{}", self.base_url, diff_log_id);
        let response = self
            .http
            .get(&url)
            .await
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;
        classify(response)
    }
}

/// Classify a backend response into parsed JSON or a fetch error
fn classify(response: HttpResponse) -> std::result::Result<serde_json::Value, FetchError> {
    if !(200..300).contains(&response.status) {
        return Err(FetchError::HttpStatus {
            code: response.status,
            snippet: snippet(&response.body),
        });
    }

    let is_json = response
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(FetchError::InvalidContentType {
            snippet: snippet(&response.body),
        });
    }

    // A body the backend mislabels as JSON gets the same classification
    serde_json::from_str(&response.body).map_err(|_| FetchError::InvalidContentType {
        snippet: snippet(&response.body),
    })
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MockHttpClient;

    fn json_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn fetch_swagger_posts_target_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| {
                url == "http://backend/api/v1/swagger" && body["url"] == "http://x/openapi"
            })
            .returning(|_, _| {
                Box::pin(async { Ok(json_response(r#"{"info": {"title": "Orders"}}"#)) })
            });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let value = client.fetch_swagger("http://x/openapi").await.unwrap();
        assert_eq!(value["info"]["title"], "Orders");
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_trimmed() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, _| url == "http://backend/api/v1/swagger")
            .returning(|_, _| Box::pin(async { Ok(json_response("{}")) }));

        let client = BackendClient::new("http://backend/", Arc::new(mock));
        client.fetch_swagger("http://x").await.unwrap();
    }

    #[tokio::test]
    async fn http_500_is_classified_with_snippet() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 500,
                    content_type: Some("text/plain".to_string()),
                    body: "oops".to_string(),
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::HttpStatus {
                code: 500,
                snippet: "oops".to_string()
            }
        );
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn non_json_content_type_is_classified() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    content_type: Some("text/plain".to_string()),
                    body: "<html>not json</html>".to_string(),
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        match err {
            FetchError::InvalidContentType { snippet } => {
                assert_eq!(snippet, "<html>not json</html>");
            }
            other => panic!("expected InvalidContentType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn snippet_is_capped_at_200_chars() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            let body = "x".repeat(500);
            Box::pin(async move {
                Ok(HttpResponse {
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body,
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        match err {
            FetchError::InvalidContentType { snippet } => {
                assert_eq!(snippet.chars().count(), 200);
            }
            other => panic!("expected InvalidContentType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn content_type_with_charset_is_accepted() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    content_type: Some("application/json; charset=utf-8".to_string()),
                    body: r#"{"paths": {}}"#.to_string(),
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let value = client.fetch_swagger("http://x").await.unwrap();
        assert!(value["paths"].is_object());
    }

    #[tokio::test]
    async fn missing_content_type_is_classified_as_non_json() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    content_type: None,
                    body: "{}".to_string(),
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidContentType { .. }));
    }

    #[tokio::test]
    async fn mislabeled_json_body_is_classified_as_non_json() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    content_type: Some("application/json".to_string()),
                    body: "definitely not json".to_string(),
                })
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidContentType { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_classified_as_unreachable() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Err(crate::CardwatchError::Http(
                    "connection refused".to_string(),
                ))
            })
        });

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let err = client.fetch_swagger("http://x").await.unwrap_err();
        assert!(matches!(err, FetchError::NetworkUnreachable(_)));
    }

    #[tokio::test]
    async fn fetch_diff_page_builds_paged_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url == "http://backend/api/v1/diff/service/orders?page=2&size=20")
            .returning(|_| Box::pin(async { Ok(json_response(r#"{"content": []}"#)) }));

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let value = client.fetch_diff_page("orders", 2, 20).await.unwrap();
        assert!(value["content"].is_array());
    }

    #[tokio::test]
    async fn fetch_diff_detail_builds_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url == "http://backend/api/v1/diff/42")
            .returning(|_| Box::pin(async { Ok(json_response(r#"{"added": []}"#)) }));

        let client = BackendClient::new("http://backend", Arc::new(mock));
        let value = client.fetch_diff_detail("42").await.unwrap();
        assert!(value["added"].is_array());
    }
}
