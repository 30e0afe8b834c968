//! Call metadata as seen by interceptor links
//!
//! HTTP/2 pseudo-headers such as `:path` are not valid gRPC metadata keys, so
//! the method path is held next to the ordinary metadata map and exposed
//! under the `:path` key.

use tonic::metadata::MetadataMap;

/// Metadata key identifying the method being invoked (`/package.Service/Method`)
pub const PATH_KEY: &str = ":path";

/// Read-only view of the metadata supplied by the transport for one call
#[derive(Debug, Clone, Default)]
pub struct CallMetadata {
    path: Option<String>,
    headers: MetadataMap,
}

impl CallMetadata {
    /// Metadata for a call to `path` with no other headers
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            headers: MetadataMap::new(),
        }
    }

    /// Metadata with no method path
    ///
    /// Links treat this as malformed input from the transport integration.
    pub fn without_path(headers: MetadataMap) -> Self {
        Self {
            path: None,
            headers,
        }
    }

    /// Build from an incoming HTTP/2 request
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        let path = request.uri().path();

        Self {
            path: (!path.is_empty()).then(|| path.to_string()),
            headers: MetadataMap::from_headers(request.headers().clone()),
        }
    }

    /// Attach ordinary metadata headers
    pub fn with_headers(mut self, headers: MetadataMap) -> Self {
        self.headers = headers;
        self
    }

    /// The method path, if the transport supplied one
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Look up an ASCII metadata value by key, including `:path`
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == PATH_KEY {
            return self.path();
        }

        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// The underlying metadata map
    pub fn headers(&self) -> &MetadataMap {
        &self.headers
    }
}
