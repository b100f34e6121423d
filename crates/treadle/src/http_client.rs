//! Minimal HTTP client abstraction for the token endpoint.
//!
//! The crate never talks to the network on its own behalf; callers inject a
//! client, and any implementation that can ship an `http::Request` and hand
//! back an `http::Response` will do.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client trait for sending raw HTTP requests.
///
/// Implementations block until the response arrives. The asynchronous grant
/// variants run the whole blocking flow on a worker, so the injected client
/// stays blocking there too.
pub trait HttpClient {
    /// Error type returned by the HTTP client
    type Error: std::error::Error + Display + Send + Sync + 'static;

    /// Send an HTTP request and return the response.
    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    type Error = T::Error;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        self.as_ref().send_http(request)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    type Error = T::Error;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        (*self).send_http(request)
    }
}

/// Per-request timeout, carried in [`http::Extensions`].
///
/// Clients that support deadlines should honor it; the bundled reqwest
/// implementation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Failures of the bundled reqwest-backed client: the transport itself, or
/// mapping its answer back into `http` types.
#[cfg(feature = "reqwest-client")]
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ReqwestClientError {
    #[error(transparent)]
    #[diagnostic(code(treadle::reqwest::transport))]
    Transport(#[from] reqwest::Error),

    #[error("response could not be rebuilt from its parts")]
    #[diagnostic(code(treadle::reqwest::response))]
    Response(#[from] http::Error),
}

#[cfg(feature = "reqwest-client")]
impl HttpClient for reqwest::blocking::Client {
    type Error = ReqwestClientError;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        let (parts, body) = request.into_parts();
        // reqwest 0.12 shares its method and header types with the `http`
        // crate, so the parts move over wholesale; only the URI needs its
        // string form.
        let mut outgoing = self
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body);
        if let Some(RequestTimeout(timeout)) = parts.extensions.get::<RequestTimeout>() {
            outgoing = outgoing.timeout(*timeout);
        }

        let incoming = outgoing.send()?;
        let mut response = http::Response::builder().status(incoming.status());
        if let Some(headers) = response.headers_mut() {
            headers.extend(incoming.headers().clone());
        }
        Ok(response.body(incoming.bytes()?.to_vec())?)
    }
}
