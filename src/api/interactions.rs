use async_trait::async_trait;
use serde::Deserialize;

use super::client::{ApiClient, ErrorPayload};
use crate::interaction::{InteractionEcho, InteractionWriter, WriteError, WriteRequest};

/// [`InteractionWriter`] backed by `POST {base}/articles/{id}/interaction`.
#[derive(Debug, Clone)]
pub struct HttpInteractionWriter {
    client: ApiClient,
}

impl HttpInteractionWriter {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

/// The endpoint may report a refusal in a 2xx body as well.
#[derive(Deserialize)]
#[serde(untagged)]
enum WriteResponse {
    Error(ErrorPayload),
    Applied(InteractionEcho),
}

#[async_trait]
impl InteractionWriter for HttpInteractionWriter {
    async fn write(&self, request: &WriteRequest) -> Result<InteractionEcho, WriteError> {
        let url = self
            .client
            .endpoint(&["articles", request.article_id.as_str(), "interaction"])?;

        match self.client.post_json(&url, &request.patch).await? {
            WriteResponse::Applied(echo) => {
                tracing::debug!(
                    article_id = %request.article_id,
                    patch = ?request.patch,
                    "Interaction write applied"
                );
                Ok(echo)
            }
            WriteResponse::Error(payload) => Err(WriteError::Rejected(payload.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::interaction::InteractionPatch;
    use crate::storage::{ArticleId, Rating};
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn writer_for(server: &MockServer) -> HttpInteractionWriter {
        HttpInteractionWriter::new(
            ApiClient::new(&server.uri())
                .unwrap()
                .with_max_retries(0)
                .with_retry_delay(Duration::from_millis(1)),
        )
    }

    fn rate(id: i64, rating: Rating) -> WriteRequest {
        WriteRequest {
            article_id: ArticleId::from(id),
            patch: InteractionPatch::Rating(rating),
        }
    }

    #[tokio::test]
    async fn test_rating_patch_posted_and_echoed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/articles/42/interaction"))
            .and(body_json(serde_json::json!({ "rating": 1 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rating": 1, "bookmarked": false}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let echo = writer_for(&server)
            .write(&rate(42, Rating::Up))
            .await
            .unwrap();

        assert_eq!(echo.rating, Some(Rating::Up));
        assert_eq!(echo.bookmarked, Some(false));
    }

    #[tokio::test]
    async fn test_bookmark_patch_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/articles/7/interaction"))
            .and(body_json(serde_json::json!({ "bookmarked": true })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"bookmarked": true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let echo = writer_for(&server)
            .write(&WriteRequest {
                article_id: ArticleId::from(7),
                patch: InteractionPatch::Bookmarked(true),
            })
            .await
            .unwrap();

        assert_eq!(echo.bookmarked, Some(true));
        assert_eq!(echo.rating, None);
    }

    #[tokio::test]
    async fn test_error_payload_in_success_body_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"error": "article locked"}"#))
            .mount(&server)
            .await;

        let result = writer_for(&server).write(&rate(1, Rating::Down)).await;

        assert!(matches!(result, Err(WriteError::Rejected(ref m)) if m == "article locked"));
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": "unauthorized"}"#))
            .mount(&server)
            .await;

        let result = writer_for(&server).write(&rate(1, Rating::Up)).await;

        assert!(matches!(
            result,
            Err(WriteError::Api(ApiError::Rejected { status: 401, .. }))
        ));
    }
}
