use crate::catalog::CatalogError;
use reqwest::Client;

/// Downloads the raw bytes behind an image URL. No decoding or conversion.
pub async fn download_image(client: &Client, url: &str) -> Result<Vec<u8>, CatalogError> {
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

    let bytes = response
        .bytes()
        .await
        .map_err(|err| CatalogError::Request(err.to_string()))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn returns_body_bytes_verbatim() {
        let server = MockServer::start_async().await;
        let body: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        let expected = body.clone();
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/content").query_param("id", "abc");
                then.status(200).header("content-type", "image/jpeg").body(body);
            })
            .await;

        let bytes = download_image(&Client::new(), &server.url("/content?id=abc"))
            .await
            .expect("download");
        assert_eq!(bytes, expected);
    }

    #[tokio::test]
    async fn missing_image_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/content");
                then.status(404);
            })
            .await;

        let err = download_image(&Client::new(), &server.url("/content"))
            .await
            .expect_err("404");
        assert!(matches!(err, CatalogError::Request(_)));
    }
}
