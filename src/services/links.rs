use axum::http::{HeaderMap, header};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::utils::validation::SanitizedName;

/// Public operations a stored file can be reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOp {
    Download,
    Stream,
    Player,
}

impl LinkOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkOp::Download => "download",
            LinkOp::Stream => "stream",
            LinkOp::Player => "player",
        }
    }
}

/// Scheme and host of the inbound request, honoring proxy forwarding headers
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https".to_string());

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or("localhost")
            .to_string();

        Self { scheme, host }
    }

    /// Absolute URL `{scheme}://{host}/{operation}/{handle}?filename={encoded}`
    pub fn url_for(&self, op: LinkOp, handle: &str, name: &SanitizedName) -> String {
        format!(
            "{}://{}/{}/{}?filename={}",
            self.scheme,
            self.host,
            op.as_str(),
            handle,
            utf8_percent_encode(name.as_str(), NON_ALPHANUMERIC)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn origin() -> RequestOrigin {
        RequestOrigin {
            scheme: "https".to_string(),
            host: "files.example.com".to_string(),
        }
    }

    #[test]
    fn test_operations_share_handle_segment() {
        let name = SanitizedName::new("x.mp4");
        let download = origin().url_for(LinkOp::Download, "abc", &name);
        let stream = origin().url_for(LinkOp::Stream, "abc", &name);

        assert!(download.contains("/abc?"));
        assert!(stream.contains("/abc?"));
        assert_eq!(
            download.replace("/download/", "/stream/"),
            stream,
            "links must differ only in the operation segment"
        );
    }

    #[test]
    fn test_filename_is_percent_encoded() {
        let name = SanitizedName::new("my movie.mp4");
        let url = origin().url_for(LinkOp::Player, "abc", &name);
        assert!(url.starts_with("https://files.example.com/player/abc?filename="));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_origin_from_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http, https"));
        headers.insert(header::HOST, HeaderValue::from_static("cdn.example.com"));

        let origin = RequestOrigin::from_headers(&headers);
        assert_eq!(origin.scheme, "http");
        assert_eq!(origin.host, "cdn.example.com");
    }

    #[test]
    fn test_origin_defaults() {
        let origin = RequestOrigin::from_headers(&HeaderMap::new());
        assert_eq!(origin.scheme, "https");
        assert_eq!(origin.host, "localhost");
    }
}
