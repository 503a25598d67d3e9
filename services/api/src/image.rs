//! Image payload normalization
//!
//! Clients supply images in several shapes: a multipart file upload, a
//! `data:<mime>;base64,<payload>` URI, a bare base64 string, or the
//! `{type: "Buffer", data: [...]}` serialization artifact some clients send
//! back verbatim. All of them are converted here, at the I/O edge, into a
//! single byte buffer plus content type. Nothing downstream branches on the
//! payload shape.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use regex::Regex;
use std::sync::OnceLock;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A normalized image payload: raw bytes and their content type
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageData {
    /// Normalize a multipart file upload
    pub fn from_upload(bytes: Vec<u8>, content_type: Option<String>) -> Result<Self, String> {
        if bytes.is_empty() {
            return Err("Uploaded image is empty".to_string());
        }
        Ok(Self {
            bytes,
            content_type: content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
        })
    }

    /// Normalize a string payload: a data URI or bare base64
    pub fn from_string(value: &str) -> Result<Self, String> {
        static DATA_URI_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = DATA_URI_REGEX.get_or_init(|| {
            Regex::new(r"^data:([^;,]+);base64,(.+)$").expect("Failed to compile data URI regex")
        });

        let value = value.trim();
        if value.is_empty() {
            return Err("Image payload is empty".to_string());
        }

        if let Some(captures) = regex.captures(value) {
            let content_type = captures[1].to_string();
            let bytes = STANDARD
                .decode(&captures[2])
                .map_err(|_| "Invalid base64 image payload".to_string())?;
            return Self::from_upload(bytes, Some(content_type));
        }

        // Assume plain base64 without a data URI wrapper
        let bytes = STANDARD
            .decode(value)
            .map_err(|_| "Invalid base64 image payload".to_string())?;
        Self::from_upload(bytes, None)
    }

    /// Normalize a JSON payload
    ///
    /// Accepts a string (delegated to [`ImageData::from_string`]) or an
    /// object carrying a byte array, either directly under `data` or nested
    /// as `{type: "Buffer", data: [...]}`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        match value {
            serde_json::Value::String(s) => Self::from_string(s),
            serde_json::Value::Object(map) => {
                let content_type = map
                    .get("contentType")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                // `data` may itself be the nested Buffer serialization
                let data = match map.get("data") {
                    Some(serde_json::Value::Object(inner)) => inner.get("data"),
                    other => other,
                };

                let bytes = data
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| "Unrecognized image payload shape".to_string())?
                    .iter()
                    .map(|v| {
                        v.as_u64()
                            .filter(|b| *b <= u8::MAX as u64)
                            .map(|b| b as u8)
                            .ok_or_else(|| "Invalid byte in image payload".to_string())
                    })
                    .collect::<Result<Vec<u8>, String>>()?;

                Self::from_upload(bytes, content_type)
            }
            _ => Err("Unrecognized image payload shape".to_string()),
        }
    }

    /// Normalize a multipart field: a file part carries raw bytes, a text
    /// part is treated as a data URI or bare base64 string
    pub async fn from_field(field: axum::extract::multipart::Field<'_>) -> Result<Self, String> {
        if field.file_name().is_some() {
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read image upload: {e}"))?;
            Self::from_upload(bytes.to_vec(), content_type)
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| format!("Failed to read image field: {e}"))?;
            Self::from_string(&value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_upload() {
        let image = ImageData::from_upload(vec![1, 2, 3], Some("image/png".to_string())).unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.content_type, "image/png");

        assert!(ImageData::from_upload(vec![], Some("image/png".to_string())).is_err());
    }

    #[test]
    fn test_from_upload_without_content_type() {
        let image = ImageData::from_upload(vec![1], None).unwrap();
        assert_eq!(image.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_from_data_uri() {
        let payload = format!("data:image/jpeg;base64,{}", STANDARD.encode([0xff, 0xd8]));
        let image = ImageData::from_string(&payload).unwrap();
        assert_eq!(image.bytes, vec![0xff, 0xd8]);
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[test]
    fn test_from_bare_base64() {
        let payload = STANDARD.encode(b"hello");
        let image = ImageData::from_string(&payload).unwrap();
        assert_eq!(image.bytes, b"hello");
        assert_eq!(image.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_from_invalid_base64() {
        assert!(ImageData::from_string("!!! not base64 !!!").is_err());
        assert!(ImageData::from_string("").is_err());
    }

    #[test]
    fn test_from_buffer_json() {
        let value = json!({"type": "Buffer", "data": [1, 2, 3]});
        let image = ImageData::from_json(&value).unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_from_nested_buffer_json_with_content_type() {
        let value = json!({
            "contentType": "image/png",
            "data": {"type": "Buffer", "data": [9, 8, 7]}
        });
        let image = ImageData::from_json(&value).unwrap();
        assert_eq!(image.bytes, vec![9, 8, 7]);
        assert_eq!(image.content_type, "image/png");
    }

    #[test]
    fn test_from_json_string_delegates() {
        let value = json!(format!("data:image/gif;base64,{}", STANDARD.encode([7u8])));
        let image = ImageData::from_json(&value).unwrap();
        assert_eq!(image.content_type, "image/gif");
    }

    #[test]
    fn test_from_json_rejects_unknown_shapes() {
        assert!(ImageData::from_json(&json!(42)).is_err());
        assert!(ImageData::from_json(&json!({"data": "nope"})).is_err());
        assert!(ImageData::from_json(&json!({"data": [1, 999]})).is_err());
    }
}
