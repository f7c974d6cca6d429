//! Construction of the underlying HTTP connections.
//!
//! Two connections are kept per client: a JSON one carrying the
//! `Content-Type: application/json` default header, and a multipart one
//! for file uploads where reqwest supplies the boundary content type
//! itself. Both carry the bearer token and, when configured, the
//! organization header.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::Config;
use crate::error::Error;

const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// Build the JSON connection: bearer auth, organization, JSON content type.
pub(crate) fn build_json_connection(config: &Config) -> Result<reqwest::Client, Error> {
    let mut headers = auth_headers(config)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    build_connection(config, headers)
}

/// Build the multipart connection: bearer auth and organization only.
pub(crate) fn build_multipart_connection(config: &Config) -> Result<reqwest::Client, Error> {
    let headers = auth_headers(config)?;
    build_connection(config, headers)
}

fn build_connection(config: &Config, headers: HeaderMap) -> Result<reqwest::Client, Error> {
    let mut builder = reqwest::Client::builder().default_headers(headers);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

fn auth_headers(config: &Config) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    let bearer = format!("Bearer {}", config.api_key.expose_secret());
    let mut auth = HeaderValue::from_str(&bearer)
        .map_err(|_| Error::Config("API key contains invalid header characters".to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let org = HeaderValue::from_str(&config.organization_id).map_err(|_| {
        Error::Config("organization id contains invalid header characters".to_string())
    })?;
    headers.insert(ORGANIZATION_HEADER, org);

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn json_connection_builds() {
        let config = Config::new("sk-test", "org-123").with_timeout(Duration::from_secs(30));
        assert!(build_json_connection(&config).is_ok());
    }

    #[test]
    fn multipart_connection_builds() {
        let config = Config::new("sk-test", "org-123");
        assert!(build_multipart_connection(&config).is_ok());
    }

    #[test]
    fn newline_in_api_key_is_a_config_error() {
        let config = Config::new("sk-bad\nkey", "org-123");
        assert!(matches!(
            build_json_connection(&config),
            Err(Error::Config(_))
        ));
    }
}
