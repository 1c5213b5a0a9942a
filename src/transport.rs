//! HTTP transport seam.
//!
//! Providers never talk to `reqwest` directly; they hand a [`Request`] to a
//! [`Transport`] and state which status codes they expect back. Anything
//! outside that set is converted immediately into the operation's typed
//! error by [`send_expect`], so no raw backend status escapes a provider.
//! Retries, if any, belong to the transport implementation, never here.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use thiserror::Error;
use tracing::debug;

use crate::errors::ProviderError;

/// Transport-level failure (connection refused, timeout, TLS, ...).
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// JSON body plus the matching content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(value.to_string().into_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Header names lowercased; repeated headers joined with `", "`.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProviderError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ProviderError::Transport(format!("malformed backend payload: {e}")))
    }

    pub fn json_value(&self) -> Result<serde_json::Value, ProviderError> {
        self.json()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The HTTP request primitive providers consume.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

/// Production transport over a shared `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .and_modify(|existing| {
                        existing.push_str(", ");
                        existing.push_str(value);
                    })
                    .or_insert_with(|| value.to_string());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Issue `request`, accepting only the statuses in `expects`; anything else
/// becomes the caller's typed error via `throws`.
pub(crate) async fn send_expect<F>(
    transport: &dyn Transport,
    request: Request,
    expects: &[u16],
    throws: F,
) -> Result<Response, ProviderError>
where
    F: FnOnce(u16, String) -> ProviderError,
{
    let method = request.method.clone();
    let url = request.url.clone();
    let response = transport
        .execute(request)
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if expects.contains(&response.status) {
        Ok(response)
    } else {
        debug!("{} {} returned unexpected status {}", method, url, response.status);
        Err(throws(response.status, response.text()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport double: canned responses keyed by method + URL,
    //! every call recorded in order.

    use std::sync::Mutex;

    use super::*;

    struct Stub {
        method: String,
        url: String,
        status: u16,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
    }

    #[derive(Default)]
    pub(crate) struct MockTransport {
        stubs: Mutex<Vec<Stub>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn stub_json(&self, method: &str, url: &str, status: u16, body: serde_json::Value) {
            self.stub_raw(method, url, status, body.to_string().into_bytes(), Vec::new());
        }

        pub fn stub_status(&self, method: &str, url: &str, status: u16) {
            self.stub_raw(method, url, status, Vec::new(), Vec::new());
        }

        pub fn stub_raw(
            &self,
            method: &str,
            url: &str,
            status: u16,
            body: Vec<u8>,
            headers: Vec<(String, String)>,
        ) {
            self.stubs.lock().unwrap().push(Stub {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body,
                headers,
            });
        }

        /// Calls seen so far, each as `"METHOD url"`, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: Request) -> Result<Response, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", request.method, request.url));

            let stubs = self.stubs.lock().unwrap();
            for stub in stubs.iter() {
                if stub.method == request.method.as_str() && stub.url == request.url {
                    return Ok(Response {
                        status: stub.status,
                        headers: stub
                            .headers
                            .iter()
                            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                            .collect(),
                        body: stub.body.clone(),
                    });
                }
            }
            Err(TransportError(format!(
                "no stub for {} {}",
                request.method, request.url
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;

    #[tokio::test]
    async fn test_send_expect_passes_expected_status() {
        let transport = MockTransport::new();
        transport.stub_json("GET", "https://api.test/thing", 404, serde_json::json!({}));

        let response = send_expect(
            &transport,
            Request::new(Method::GET, "https://api.test/thing"),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await
        .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_send_expect_converts_unexpected_status() {
        let transport = MockTransport::new();
        transport.stub_status("GET", "https://api.test/thing", 500);

        let err = send_expect(
            &transport,
            Request::new(Method::GET, "https://api.test/thing"),
            &[200],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Metadata { code: 500, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_transport_error() {
        let transport = MockTransport::new();
        let err = send_expect(
            &transport,
            Request::new(Method::GET, "https://api.test/unstubbed"),
            &[200],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
