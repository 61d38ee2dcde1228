//! HTTP transport backed by `reqwest`.
//!
//! Relative request URLs are resolved against the configured backend origin,
//! so the session manager can work in terms of API paths.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Url};
use tracing::debug;

use super::transport::{HttpResponse, OutboundRequest, RequestBody, Transport};
use super::TransportError;
use crate::config::Config;

/// Transport for a single backend origin.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid base URL {}: {}", config.base_url, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(url)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(fields)) => {
                let form = fields
                    .iter()
                    .fold(multipart::Form::new(), |form, (name, value)| {
                        form.text(name.clone(), value.clone())
                    });
                builder.multipart(form)
            }
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Received response");
        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let transport = HttpTransport::new(&Config {
            base_url: "https://loja.example.com".to_string(),
            ..Config::default()
        })
        .unwrap();

        assert_eq!(
            transport.resolve("/api/usuarios/login/").unwrap().as_str(),
            "https://loja.example.com/api/usuarios/login/"
        );
        assert_eq!(
            transport.resolve("https://brasilapi.com.br/api/cep/v2/01001000").unwrap().host_str(),
            Some("brasilapi.com.br")
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpTransport::new(&Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        });
        assert!(result.is_err());
    }
}
