//! `multipart/form-data` parts of a POST request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content of one form part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartContent {
    Text(String),
    File {
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// One named part of a `multipart/form-data` body.
///
/// Parts keep the order they were added in; a form with the same parts in a
/// different order is a different request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormPart {
    name: String,
    content: PartContent,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content: PartContent::File {
                file_name: file_name.into(),
                content_type,
                bytes: bytes.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &PartContent {
        &self.content
    }
}

impl fmt::Display for FormPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            PartContent::Text(_) => f.write_str(&self.name),
            PartContent::File {
                file_name, bytes, ..
            } => write!(f, "{}={} ({} bytes)", self.name, file_name, bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hides_values() {
        assert_eq!(FormPart::text("description", "secret").to_string(), "description");
        let file = FormPart::file("file", "cat.png", Some("image/png".into()), vec![0u8; 3]);
        assert_eq!(file.to_string(), "file=cat.png (3 bytes)");
    }

    #[test]
    fn test_serde_shape() {
        let part = FormPart::file("file", "a.txt", None, b"hi".to_vec());
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["name"], "file");
        assert_eq!(json["content"]["file"]["file_name"], "a.txt");
        assert!(json["content"]["file"].get("content_type").is_none());

        let decoded: FormPart = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, part);

        let text: FormPart =
            serde_json::from_str(r#"{"name":"status","content":{"text":"hi"}}"#).unwrap();
        assert_eq!(text, FormPart::text("status", "hi"));
    }
}
