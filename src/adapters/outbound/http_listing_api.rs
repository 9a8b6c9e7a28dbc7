//! HTTP Listing API
//!
//! Implements ListingApi against the Pop-Up REST backend using reqwest.
//! Request and response bodies are JSON with camelCase keys.

use crate::domain::entities::{MarkerRecord, PostDetail};
use crate::domain::ports::{ApiError, ListingApi};
use crate::domain::value_objects::{BoundsCorners, MarkerId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Error body returned by the backend on non-success statuses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    title: String,
    message: String,
    #[serde(default)]
    error_details: Option<String>,
}

/// Configuration for the HTTP listing client.
#[derive(Debug, Clone)]
pub struct HttpListingConfig {
    /// Base URL including the `/api` prefix (e.g., "http://localhost:8080/api")
    pub base_url: String,
    /// Bearer token sent with every request, if logged in
    pub session_token: Option<String>,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,
}

impl Default for HttpListingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            session_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// reqwest-backed listing API.
pub struct HttpListingApi {
    config: HttpListingConfig,
    client: reqwest::Client,
}

impl HttpListingApi {
    /// Build a client. Fails only if the TLS backend cannot be initialised.
    pub fn new(config: HttpListingConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("client error: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode a success body, or map the failure.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.request_timeout.as_millis() as u64)
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn error_from_body(status: u16, body: &[u8]) -> ApiError {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(err) => ApiError::Rejected {
                status,
                title: err.title,
                message: err.message,
                details: err.error_details,
            },
            Err(_) => ApiError::Status(status),
        }
    }
}

#[async_trait]
impl ListingApi for HttpListingApi {
    async fn fetch_markers_in_bounds(
        &self,
        corners: &BoundsCorners,
    ) -> Result<Vec<MarkerRecord>, ApiError> {
        let request = self
            .authorize(self.client.post(self.url("/posts/map")))
            .json(corners);

        let markers: Vec<MarkerRecord> = self.send(request).await?;
        tracing::trace!("listing API returned {} markers", markers.len());
        Ok(markers)
    }

    async fn fetch_marker_detail(&self, id: MarkerId) -> Result<PostDetail, ApiError> {
        let request = self
            .authorize(self.client.get(self.url("/posts")))
            .query(&[("id", id.0)]);

        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{GeoBounds, GeoPoint, PostType};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer, token: Option<&str>) -> HttpListingApi {
        HttpListingApi::new(HttpListingConfig {
            base_url: format!("{}/api", server.uri()),
            session_token: token.map(|t| t.to_string()),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn corners() -> BoundsCorners {
        GeoBounds::from_corners(40.0, -70.0, 39.0, -71.0).corners()
    }

    // ===== fetch_markers_in_bounds Tests =====

    #[tokio::test]
    async fn test_fetch_markers_posts_corners() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts/map"))
            .and(body_json(serde_json::json!({
                "topLeft": { "latitude": 40.0, "longitude": -71.0 },
                "topRight": { "latitude": 40.0, "longitude": -70.0 },
                "bottomRight": { "latitude": 39.0, "longitude": -70.0 },
                "bottomLeft": { "latitude": 39.0, "longitude": -71.0 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "postType": "YARD_SALE", "location": { "latitude": 39.5, "longitude": -70.5 } },
                { "id": 2, "postType": "FOOD_TRUCK", "location": { "latitude": 39.6, "longitude": -70.4 } }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let markers = api_for(&mock_server, None)
            .fetch_markers_in_bounds(&corners())
            .await
            .unwrap();

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, MarkerId(1));
        assert_eq!(markers[0].post_type, PostType::YardSale);
        assert_eq!(markers[1].location, GeoPoint::new(39.6, -70.4));
    }

    #[tokio::test]
    async fn test_fetch_markers_sends_bearer_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts/map"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let markers = api_for(&mock_server, Some("secret"))
            .fetch_markers_in_bounds(&corners())
            .await
            .unwrap();

        assert!(markers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_markers_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts/map"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "title": "Bad Request",
                "message": "viewport too large",
                "errorDetails": "max 50km"
            })))
            .mount(&mock_server)
            .await;

        let err = api_for(&mock_server, None)
            .fetch_markers_in_bounds(&corners())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                title: "Bad Request".to_string(),
                message: "viewport too large".to_string(),
                details: Some("max 50km".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_markers_unreadable_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts/map"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        let err = api_for(&mock_server, None)
            .fetch_markers_in_bounds(&corners())
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Status(503));
    }

    #[tokio::test]
    async fn test_fetch_markers_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/posts/map"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = api_for(&mock_server, None)
            .fetch_markers_in_bounds(&corners())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_markers_connection_refused() {
        // Nothing listens on port 1
        let api = HttpListingApi::new(HttpListingConfig {
            base_url: "http://127.0.0.1:1/api".to_string(),
            ..Default::default()
        })
        .unwrap();

        let err = api.fetch_markers_in_bounds(&corners()).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    // ===== fetch_marker_detail Tests =====

    #[tokio::test]
    async fn test_fetch_detail_by_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .and(query_param("id", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 12,
                "title": "Farmers market",
                "description": "Fresh produce",
                "location": { "latitude": 40.1, "longitude": -74.2 },
                "distance": 1.2,
                "type": "FARMERS_MARKET",
                "pictures": null,
                "postTime": { "day": 1, "month": 6, "year": 2024, "hour": 8, "minute": 0 },
                "startTime": { "day": 2, "month": 6, "year": 2024, "hour": 9, "minute": 0 },
                "endTime": { "day": 2, "month": 6, "year": 2024, "hour": 13, "minute": 0 },
                "owner": {
                    "id": 3,
                    "firstname": "Sam",
                    "lastname": "K",
                    "username": "samk",
                    "email": "sam@example.com",
                    "profilePicture": null,
                    "preferences": ["FARMERS_MARKET"]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let detail = api_for(&mock_server, None)
            .fetch_marker_detail(MarkerId(12))
            .await
            .unwrap();

        assert_eq!(detail.id, MarkerId(12));
        assert_eq!(detail.title, "Farmers market");
        assert_eq!(detail.post_type, PostType::FarmersMarket);
        assert_eq!(detail.distance, Some(1.2));
        assert_eq!(detail.owner.preferences, Some(vec![PostType::FarmersMarket]));
    }

    #[tokio::test]
    async fn test_fetch_detail_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/posts"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "title": "Not Found",
                "message": "post 99 does not exist"
            })))
            .mount(&mock_server)
            .await;

        let err = api_for(&mock_server, None)
            .fetch_marker_detail(MarkerId(99))
            .await
            .unwrap_err();

        match err {
            ApiError::Rejected { status, details, .. } => {
                assert_eq!(status, 404);
                assert_eq!(details, None);
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let api = HttpListingApi::new(HttpListingConfig {
            base_url: "http://host/api/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(api.url("/posts/map"), "http://host/api/posts/map");
    }
}
