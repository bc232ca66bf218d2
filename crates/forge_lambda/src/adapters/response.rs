use forge_core::contract::CustomResourceResponse;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize custom resource response: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to deliver custom resource response: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response url rejected delivery with status {0}")]
    Rejected(u16),
}

/// PUTs the response document to the pre-signed `ResponseURL`. The signature
/// covers an empty content type, so none is sent.
pub async fn deliver_response(
    client: &reqwest::Client,
    response_url: &str,
    response: &CustomResourceResponse,
) -> Result<(), DeliveryError> {
    let body = serde_json::to_vec(response)?;
    let reply = client
        .put(response_url)
        .header(CONTENT_TYPE, "")
        .body(body)
        .send()
        .await?;

    if !reply.status().is_success() {
        return Err(DeliveryError::Rejected(reply.status().as_u16()));
    }
    Ok(())
}
