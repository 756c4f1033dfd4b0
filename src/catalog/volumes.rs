use crate::catalog::CatalogError;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use urlencoding::encode;

/// Parsed result of one ISBN query. An empty `items` list is a valid answer.
#[derive(Debug, Clone, Default)]
pub struct CatalogResponse {
    pub total_items: u32,
    pub items: Vec<CatalogItem>,
}

impl CatalogResponse {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogItem {
    pub title: Option<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub extra_large: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesPayload {
    #[serde(default)]
    total_items: u32,
    #[serde(default)]
    items: Option<Vec<VolumeRecord>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeRecord {
    #[serde(default)]
    volume_info: Option<VolumeInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image_links: Option<ImageLinks>,
}

impl From<VolumesPayload> for CatalogResponse {
    fn from(payload: VolumesPayload) -> Self {
        let items = payload
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|record| match record.volume_info {
                Some(info) => CatalogItem {
                    title: info.title,
                    image_links: info.image_links,
                },
                None => CatalogItem::default(),
            })
            .collect();
        Self {
            total_items: payload.total_items,
            items,
        }
    }
}

pub async fn search_by_isbn(
    client: &Client,
    api_root: &str,
    isbn: &str,
) -> Result<CatalogResponse, CatalogError> {
    let url = format!("{}/volumes?q=isbn:{}", api_root, encode(isbn));
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| CatalogError::Request(err.to_string()))?;

    if !response.status().is_success() {
        return Err(CatalogError::Request(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let payload: VolumesPayload = response
        .json()
        .await
        .map_err(|err| CatalogError::Deserialize(err.to_string()))?;
    let parsed = CatalogResponse::from(payload);
    debug!(
        target = "covers.catalog",
        isbn,
        total_items = parsed.total_items,
        items = parsed.items.len(),
        "volumes_lookup"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn lookup_parses_items_in_catalog_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/volumes")
                    .query_param("q", "isbn:9780441013593");
                then.status(200).json_body(json!({
                    "kind": "books#volumes",
                    "totalItems": 2,
                    "items": [
                        {
                            "volumeInfo": {
                                "title": "Dune",
                                "imageLinks": {
                                    "smallThumbnail": "http://books.example/s",
                                    "thumbnail": "http://books.example/t",
                                    "extraLarge": "http://books.example/xl"
                                }
                            }
                        },
                        { "volumeInfo": { "title": "Dune Messiah" } }
                    ]
                }));
            })
            .await;

        let client = Client::new();
        let response = search_by_isbn(&client, &server.base_url(), "9780441013593")
            .await
            .expect("lookup");

        mock.assert_async().await;
        assert_eq!(response.total_items, 2);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].title.as_deref(), Some("Dune"));
        let links = response.items[0].image_links.clone().expect("links");
        assert_eq!(links.extra_large.as_deref(), Some("http://books.example/xl"));
        assert_eq!(links.thumbnail.as_deref(), Some("http://books.example/t"));
        assert!(response.items[1].image_links.is_none());
    }

    #[tokio::test]
    async fn missing_items_is_an_empty_response_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes");
                then.status(200)
                    .json_body(json!({ "kind": "books#volumes", "totalItems": 0 }));
            })
            .await;

        let response = search_by_isbn(&Client::new(), &server.base_url(), "0000000000")
            .await
            .expect("lookup");
        assert!(response.is_empty());
        assert_eq!(response.total_items, 0);
    }

    #[tokio::test]
    async fn non_success_status_is_a_request_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes");
                then.status(503);
            })
            .await;

        let err = search_by_isbn(&Client::new(), &server.base_url(), "123")
            .await
            .expect_err("503 should fail");
        assert!(matches!(err, CatalogError::Request(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_deserialize_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes");
                then.status(200).body("<html>rate limited</html>");
            })
            .await;

        let err = search_by_isbn(&Client::new(), &server.base_url(), "123")
            .await
            .expect_err("html should fail");
        assert!(matches!(err, CatalogError::Deserialize(_)));
    }
}
