use crate::shared::Result;
use anyhow::Context;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds the HTTP client shared by the registry and OSV adapters
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let user_agent = format!("chainsight/{}", env!("CARGO_PKG_VERSION"));
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("failed to build HTTP client")?;
    Ok(client)
}

/// GETs `url` as JSON, retrying transient failures with a linear backoff.
/// A 404 is final and not retried.
pub(crate) async fn get_json_with_retry<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    max_retries: u32,
) -> Result<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match get_json(client, url).await {
            Ok(value) => return Ok(value),
            Err(FetchError::NotFound) => anyhow::bail!("{} returned 404 Not Found", url),
            Err(FetchError::Transient(e)) if attempt < max_retries.max(1) => {
                tracing::debug!(url, attempt, error = %e, "request failed, retrying");
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
            }
            Err(FetchError::Transient(e)) => return Err(e),
        }
    }
}

enum FetchError {
    NotFound,
    Transient(anyhow::Error),
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<T, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transient(e.into()))?;
    match response.status() {
        StatusCode::NOT_FOUND => Err(FetchError::NotFound),
        status if !status.is_success() => Err(FetchError::Transient(anyhow::anyhow!(
            "{} returned status code {}",
            url,
            status
        ))),
        _ => response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Transient(e.into())),
    }
}

/// Rejects names that could escape the registry path
pub(crate) fn validate_url_component(component: &str, allow_scope: bool) -> Result<()> {
    if component.is_empty() {
        anyhow::bail!("Security: package name is empty");
    }
    if component.contains("..") || component.contains('\\') {
        anyhow::bail!("Security: package name '{}' contains path traversal", component);
    }
    if component.contains('#') || component.contains('?') {
        anyhow::bail!("Security: package name '{}' contains URL-unsafe characters", component);
    }
    let scoped = allow_scope && component.starts_with('@') && component.matches('/').count() == 1;
    if component.contains('/') && !scoped {
        anyhow::bail!(
            "Security: package name '{}' contains path separators which are not allowed",
            component
        );
    }
    if component.contains('@') && !scoped {
        anyhow::bail!("Security: package name '{}' contains '@'", component);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_component() {
        assert!(validate_url_component("requests", false).is_ok());
        assert!(validate_url_component("@types/node", true).is_ok());
        assert!(validate_url_component("@types/node", false).is_err());
        assert!(validate_url_component("a/b", true).is_err());
        assert!(validate_url_component("../etc", true).is_err());
        assert!(validate_url_component("pkg?x=1", false).is_err());
        assert!(validate_url_component("", false).is_err());
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }
}
