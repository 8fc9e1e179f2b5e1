//! Upstream path as received on the wire.
//!
//! The proxied path is taken undecoded from the request URI. Each segment is
//! percent-decoded once for inspection: segments that the upstream URL parser
//! or server would reinterpret (dot segments, encoded separators) are refused.
//! The raw form is forwarded and the decoded form is classified, so both sides
//! see the same path.
use percent_encoding::percent_decode_str;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment is not valid UTF-8 once decoded")]
    Encoding,
    #[error("dot segments are not allowed")]
    DotSegment,
    #[error("path segment decodes to a reserved character")]
    ReservedCharacter,
}

/// Characters that would end or split a segment if they reached the upstream decoded.
const RESERVED: [char; 4] = ['/', '?', '#', '\\'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamPath {
    raw: String,
    decoded: String,
}

impl UpstreamPath {
    /// `raw` is the path part of the request URI below the proxy mount, still percent-encoded.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut raw_segments = Vec::new();
        let mut decoded_segments = Vec::new();

        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| PathError::Encoding)?;
            if decoded == "." || decoded == ".." {
                return Err(PathError::DotSegment);
            }
            if decoded.contains(RESERVED) {
                return Err(PathError::ReservedCharacter);
            }
            raw_segments.push(segment);
            decoded_segments.push(decoded.into_owned());
        }

        Ok(Self {
            raw: format!("/{}", raw_segments.join("/")),
            decoded: format!("/{}", decoded_segments.join("/")),
        })
    }

    /// Still-encoded path, forwarded byte for byte.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded path, used for classification and logs.
    pub fn decoded(&self) -> &str {
        &self.decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through() {
        let p = UpstreamPath::parse("/portfolios//7/").unwrap();
        assert_eq!(p.raw(), "/portfolios/7");
        assert_eq!(p.decoded(), "/portfolios/7");
        assert_eq!(UpstreamPath::parse("").unwrap().raw(), "/");
    }

    #[test]
    fn encoded_letters_are_decoded_for_classification_only() {
        let p = UpstreamPath::parse("/p%6Frtfolios/a%20b").unwrap();
        assert_eq!(p.raw(), "/p%6Frtfolios/a%20b");
        assert_eq!(p.decoded(), "/portfolios/a b");
    }

    #[test]
    fn dot_segments_are_refused() {
        for raw in ["/x/../portfolios", "/./me", "/x/%2e%2e/me", "/x/%2E/me"] {
            assert_eq!(UpstreamPath::parse(raw), Err(PathError::DotSegment), "{raw}");
        }
        assert!(UpstreamPath::parse("/files/v1.2..3").is_ok());
    }

    #[test]
    fn encoded_separators_are_refused() {
        for raw in [
            "/portfolios%3Fx=1",
            "/portfolios%23",
            "/x%2F..%2Fme",
            "/x%5Cme",
            "/x\\me",
        ] {
            assert_eq!(
                UpstreamPath::parse(raw),
                Err(PathError::ReservedCharacter),
                "{raw}"
            );
        }
    }

    #[test]
    fn invalid_utf8_is_refused() {
        assert_eq!(UpstreamPath::parse("/%FF"), Err(PathError::Encoding));
    }
}
