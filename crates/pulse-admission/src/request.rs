//! Read-only view of an inbound request.

use std::collections::HashMap;
use std::net::IpAddr;

/// The slice of an inbound HTTP request visible to the admission engine.
///
/// Header lookup is case-insensitive; header names are lowercased at
/// construction. The transport layer in front of the engine is responsible
/// for producing one `RequestView` per request.
#[derive(Debug, Clone)]
pub struct RequestView {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    source_ip: IpAddr,
}

impl RequestView {
    /// Starts building a request view for the given source IP.
    #[must_use]
    pub fn builder(source_ip: IpAddr) -> RequestViewBuilder {
        RequestViewBuilder::new(source_ip)
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up a header value by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body length in bytes.
    #[must_use]
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }

    /// The client source IP address.
    #[must_use]
    pub const fn source_ip(&self) -> IpAddr {
        self.source_ip
    }
}

/// Builder for [`RequestView`].
#[derive(Debug)]
pub struct RequestViewBuilder {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    source_ip: IpAddr,
}

impl RequestViewBuilder {
    fn new(source_ip: IpAddr) -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            source_ip,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Adds a header. Names are stored lowercased.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the view.
    #[must_use]
    pub fn build(self) -> RequestView {
        RequestView {
            method: self.method,
            path: self.path,
            headers: self.headers,
            body: self.body,
            source_ip: self.source_ip,
        }
    }
}
