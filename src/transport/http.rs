//! reqwest-backed transport.
//!
//! # Responsibilities
//! - Resolve routes against the configured base URL
//! - Encode parameters as a query string, a urlencoded form or a multipart form
//! - Attach the `Authorization` header when a credential was unlocked
//! - Map non-2xx statuses and reqwest failures to [`TransportError`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use url::Url;

use crate::config::TransportConfig;
use crate::request::{FormPart, Method, PartContent, RequestDescriptor};
use crate::transport::{Response, Transport, TransportError};

/// Longest error body kept in a [`TransportError::Http`].
const MAX_ERROR_BODY: usize = 4096;

/// HTTP transport over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from configuration.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::InvalidRequest(format!("base URL '{}': {}", config.base_url, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, route: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(route)
            .map_err(|e| TransportError::InvalidRequest(format!("route '{}': {}", route, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        authorization: Option<&str>,
    ) -> Result<Response, TransportError> {
        let method = descriptor.method();
        let route = descriptor.route();
        let url = self.resolve(route)?;
        let pairs = descriptor.parameters().as_pairs();

        let mut request = match method {
            Method::Get => self.client.get(url).query(pairs),
            Method::Delete => self.client.delete(url).query(pairs),
            Method::Post if descriptor.is_multipart() => {
                let form = multipart_form(pairs, descriptor.parts())?;
                self.client.post(url).multipart(form)
            }
            Method::Post if pairs.is_empty() => self.client.post(url),
            Method::Post => self.client.post(url).form(pairs),
        };
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
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
        let body = response.bytes().await.map_err(classify)?;

        tracing::debug!(
            method = %method,
            route = %route,
            status = status.as_u16(),
            "Transport response"
        );

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(Response::with_headers(status.as_u16(), headers, body))
    }
}

/// Build a multipart body: parameters first as text fields, then the parts in order.
fn multipart_form(pairs: &[(String, String)], parts: &[FormPart]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in pairs {
        form = form.text(name.clone(), value.clone());
    }
    for part in parts {
        let body = match part.content() {
            PartContent::Text(value) => Part::text(value.clone()),
            PartContent::File {
                file_name,
                content_type,
                bytes,
            } => {
                let file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                match content_type {
                    Some(mime) => file.mime_str(mime).map_err(|e| {
                        TransportError::InvalidRequest(format!(
                            "content type '{}' of part '{}': {}",
                            mime,
                            part.name(),
                            e
                        ))
                    })?,
                    None => file,
                }
            }
        };
        form = form.part(part.name().to_string(), body);
    }
    Ok(form)
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Io(error.to_string())
    }
}

fn truncate_body(bytes: &[u8]) -> String {
    let end = bytes.len().min(MAX_ERROR_BODY);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        let config = TransportConfig {
            base_url: base.to_string(),
            ..TransportConfig::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_route_resolution() {
        let t = transport("https://mastodon.example/");
        assert_eq!(
            t.resolve("/api/v1/statuses").unwrap().as_str(),
            "https://mastodon.example/api/v1/statuses"
        );
        assert_eq!(
            t.resolve("https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = TransportConfig {
            base_url: "not a url".into(),
            ..TransportConfig::default()
        };
        let err = HttpTransport::new(&config).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn test_multipart_rejects_bad_content_type() {
        let parts = [FormPart::file("file", "x.bin", Some("not a mime".into()), vec![0])];
        let err = multipart_form(&[], &parts).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));

        let parts = [
            FormPart::text("description", "a cat"),
            FormPart::file("file", "cat.png", Some("image/png".into()), vec![1, 2]),
        ];
        assert!(multipart_form(&[("focus".into(), "0,0".into())], &parts).is_ok());
    }

    #[test]
    fn test_truncate_body() {
        let long = vec![b'a'; MAX_ERROR_BODY + 10];
        assert_eq!(truncate_body(&long).len(), MAX_ERROR_BODY);
        assert_eq!(truncate_body(b"oops"), "oops");
    }
}
