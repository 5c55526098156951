//! Support surface for generated marshalling code
//!
//! Serializers fill a [`RequestParts`]; parsers read a [`ResponseParts`].
//! Neither performs any I/O: sending the request is the caller's job.

use std::collections::BTreeMap;

use bytes::Bytes;
use thiserror::Error as ThisError;

mod xml;
pub use xml::{XmlElement, XmlError};

/// `strftime` pattern for RFC 822 timestamps
pub const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, ThisError)]
pub enum DecodeError {
    #[error("invalid json response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid xml response: {0}")]
    Xml(#[from] XmlError),
}

/// Wire pieces of a request, minus transport
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParts {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    /// values for `{Label}` segments of the request uri
    pub labels: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RequestParts {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Fills `{Label}` and greedy `{Label+}` segments of a request uri template
    /// and appends the query string
    pub fn expand_uri(&self, template: &str) -> String {
        let mut uri = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(end) = rest[start..].find('}').map(|e| start + e) else {
                break;
            };
            uri.push_str(&rest[..start]);
            let label = &rest[start + 1..end];
            let (name, greedy) = match label.strip_suffix('+') {
                Some(name) => (name, true),
                None => (label, false),
            };
            if let Some(value) = self.labels.get(name) {
                uri.push_str(&encode_label(value, greedy));
            }
            rest = &rest[end + 1..];
        }
        uri.push_str(rest);
        if !self.query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&form_encode(&self.query));
        }
        uri
    }
}

fn encode_label(value: &str, greedy: bool) -> String {
    let encode = |s: &str| {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>().replace('+', "%20")
    };
    if greedy {
        value.split('/').map(encode).collect::<Vec<_>>().join("/")
    } else {
        encode(value)
    }
}

/// `application/x-www-form-urlencoded` encoding, spaces as `+`
pub fn form_encode(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
}

/// Wire pieces of a response
#[derive(Clone, Debug, Default)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseParts {
    pub fn new(status: u16) -> ResponseParts {
        ResponseParts { status, ..Default::default() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> ResponseParts {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> ResponseParts {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Header value, name compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every header starting with `prefix`, keyed by the rest of the name
    pub fn headers_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter(|(n, _)| {
                n.len() >= prefix.len()
                    && n.is_char_boundary(prefix.len())
                    && n[..prefix.len()].eq_ignore_ascii_case(prefix)
            })
            .map(|(n, v)| (n[prefix.len()..].to_string(), v.clone()))
            .collect()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as a json document; an empty body reads as `null`
    pub fn json(&self) -> Result<serde_json::Value, DecodeError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as an xml document; an empty body reads as an empty element
    pub fn xml(&self) -> Result<XmlElement, DecodeError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(XmlElement::default());
        }
        Ok(XmlElement::parse(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
        p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn form_encoding_uses_plus_for_spaces() {
        let encoded = form_encode(&pairs(&[("Action", "Publish"), ("Message", "hi there&more")]));
        assert_eq!(encoded, "Action=Publish&Message=hi+there%26more");
    }

    #[test]
    fn uri_labels_and_query() {
        let mut parts = RequestParts::default();
        parts.labels.insert("Bucket".into(), "my bucket".into());
        parts.labels.insert("Key".into(), "a/b c.txt".into());
        parts.query = pairs(&[("versionId", "3")]);
        assert_eq!(parts.expand_uri("/{Bucket}/{Key+}"), "/my%20bucket/a/b%20c.txt?versionId=3");
        assert_eq!(parts.expand_uri("/{Bucket}?acl"), "/my%20bucket?acl&versionId=3");
    }

    #[test]
    fn response_headers_ignore_case() {
        let response = ResponseParts::new(200)
            .with_header("X-Amz-Meta-Color", "blue")
            .with_header("x-amz-meta-size", "9")
            .with_header("ETag", "\"abc\"");
        assert_eq!(response.header("etag"), Some("\"abc\""));
        let meta = response.headers_with_prefix("x-amz-meta-");
        assert_eq!(meta.get("Color").map(String::as_str), Some("blue"));
        assert_eq!(meta.get("size").map(String::as_str), Some("9"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn empty_bodies_decode_to_nothing() {
        let response = ResponseParts::new(204);
        assert_eq!(response.json().unwrap(), serde_json::Value::Null);
        assert_eq!(response.xml().unwrap(), XmlElement::default());
        assert!(ResponseParts::new(200).with_body("{oops").json().is_err());
    }
}
