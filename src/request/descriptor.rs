//! Canonical identity of a logical request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::{FormPart, Parameters};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a request must carry a credential obtained from the authentication lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authentication {
    #[default]
    None,
    Scheduled,
}

impl Authentication {
    pub fn is_required(&self) -> bool {
        matches!(self, Authentication::Scheduled)
    }
}

/// Whether an interrupted request leaves a journal row to be replayed by `resume()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resumption {
    #[default]
    None,
    Resumable,
}

impl Resumption {
    pub fn is_resumable(&self) -> bool {
        matches!(self, Resumption::Resumable)
    }
}

/// Method, route, parameters, form parts and authentication requirement of a
/// request.
///
/// Two descriptors compare and hash equal iff they describe the same logical
/// request. Used both as the dedup key and as the journal key. Form parts are
/// only sent for POST, as a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDescriptor {
    method: Method,
    route: String,
    #[serde(default)]
    parameters: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parts: Vec<FormPart>,
    #[serde(default)]
    authentication: Authentication,
}

impl RequestDescriptor {
    pub fn new(method: Method, route: impl Into<String>, authentication: Authentication) -> Self {
        Self {
            method,
            route: route.into(),
            parameters: Parameters::new(),
            parts: Vec::new(),
            authentication,
        }
    }

    pub fn get(route: impl Into<String>, authentication: Authentication) -> Self {
        Self::new(Method::Get, route, authentication)
    }

    pub fn post(route: impl Into<String>, authentication: Authentication) -> Self {
        Self::new(Method::Post, route, authentication)
    }

    pub fn delete(route: impl Into<String>, authentication: Authentication) -> Self {
        Self::new(Method::Delete, route, authentication)
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parts(mut self, parts: impl IntoIterator<Item = FormPart>) -> Self {
        self.parts = parts.into_iter().collect();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    pub fn authentication(&self) -> Authentication {
        self.authentication
    }

    /// Canonical text form, e.g. `POST /api/v1/statuses?status=hi [authenticated]`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.route)?;
        if !self.parameters.is_empty() {
            write!(f, "?{}", self.parameters.encode())?;
        }
        if !self.parts.is_empty() {
            f.write_str(" [multipart:")?;
            for part in &self.parts {
                write!(f, " {}", part)?;
            }
            f.write_str("]")?;
        }
        if self.authentication.is_required() {
            f.write_str(" [authenticated]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_requests_share_a_key() {
        let a = RequestDescriptor::post("/api/v1/statuses", Authentication::Scheduled)
            .with_parameters(Parameters::from_pairs([("status", "hi"), ("language", "en")]));
        let b = RequestDescriptor::post("/api/v1/statuses", Authentication::Scheduled)
            .with_parameters(Parameters::from_pairs([("language", "en"), ("status", "hi")]));
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_routes_are_distinct() {
        let a = RequestDescriptor::get("/api/v1/resource", Authentication::None);
        let b = RequestDescriptor::get("/api/v2/resource", Authentication::None);
        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_authentication_is_part_of_identity() {
        let anonymous = RequestDescriptor::get("/r", Authentication::None);
        let authenticated = RequestDescriptor::get("/r", Authentication::Scheduled);
        assert_ne!(anonymous, authenticated);
        assert_eq!(authenticated.key(), "GET /r [authenticated]");
    }

    #[test]
    fn test_key_rendering() {
        let descriptor = RequestDescriptor::delete("/api/v1/statuses/1", Authentication::None);
        assert_eq!(descriptor.key(), "DELETE /api/v1/statuses/1");

        let descriptor = RequestDescriptor::get("/api/v1/timelines/public", Authentication::None)
            .with_parameters(Parameters::new().with("limit", "20").with("local", "true"));
        assert_eq!(descriptor.key(), "GET /api/v1/timelines/public?limit=20&local=true");
    }

    #[test]
    fn test_serde_shape() {
        let descriptor = RequestDescriptor::post("/r", Authentication::Scheduled)
            .with_parameters(Parameters::new().with("a", "1"));
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["authentication"], "scheduled");

        let decoded: RequestDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_parts_are_part_of_identity() {
        let plain = RequestDescriptor::post("/api/v2/media", Authentication::Scheduled);
        let upload = plain
            .clone()
            .with_parts([FormPart::file("file", "cat.png", None, vec![1, 2, 3])]);
        assert_ne!(plain, upload);
        assert!(upload.is_multipart());
        assert_eq!(
            upload.key(),
            "POST /api/v2/media [multipart: file=cat.png (3 bytes)] [authenticated]"
        );

        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("parts").is_none());
        let decoded: RequestDescriptor =
            serde_json::from_value(serde_json::to_value(&upload).unwrap()).unwrap();
        assert_eq!(decoded, upload);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let json = r#"{"method":"PATCH","route":"/r"}"#;
        assert!(serde_json::from_str::<RequestDescriptor>(json).is_err());
    }
}
