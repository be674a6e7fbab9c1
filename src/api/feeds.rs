use async_trait::async_trait;

use super::client::ApiClient;
use crate::feed::{Cursor, FeedFetcher, FetchError, Page, PageRequest};

/// [`FeedFetcher`] backed by `GET {base}/feeds/{feed}`.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: ApiClient,
}

impl HttpFeedFetcher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let mut url = self.client.endpoint(&["feeds", request.feed.as_str()])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &request.limit.to_string());
            match &request.cursor {
                Cursor::Latest => {}
                Cursor::Since(id) => {
                    query.append_pair("since_id", id.as_str());
                }
                Cursor::Before(id) => {
                    query.append_pair("max_id", id.as_str());
                }
            }
        }

        let page: Page = self.client.get_json(&url).await?;
        tracing::debug!(
            feed = %request.feed,
            cursor = ?request.cursor,
            articles = page.articles.len(),
            sources = page.sources.len(),
            "Fetched feed page"
        );
        Ok(page)
    }
}
