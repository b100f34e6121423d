//! Minimal OAuth 2.0 client for native applications.
//!
//! Implements the RFC 8252 loopback profile: the authorization code grant
//! with PKCE (RFC 7636) over a one-shot `127.0.0.1` redirect listener, plus
//! the client credentials and refresh token grants. Token endpoint traffic
//! goes through an injected [`HttpClient`](http_client::HttpClient); token
//! responses come back verbatim for the caller to interpret.
//!
//! ```no_run
//! # struct AnyHttpClient;
//! # impl treadle::http_client::HttpClient for AnyHttpClient {
//! #     type Error = std::convert::Infallible;
//! #     fn send_http(
//! #         &self,
//! #         _request: http::Request<Vec<u8>>,
//! #     ) -> Result<http::Response<Vec<u8>>, Self::Error> {
//! #         Ok(http::Response::new(Vec::new()))
//! #     }
//! # }
//! # fn main() -> treadle::Result<()> {
//! let client = treadle::client("oauth-client-id")
//!     .with_token_endpoint(url::Url::parse("https://login.example.com/oauth2/token").unwrap())?;
//!
//! let response = client
//!     .authorization_code_grant(url::Url::parse("https://login.example.com/oauth2/authorize").unwrap())
//!     .authorize(
//!         &AnyHttpClient,
//!         |uri| println!("open {uri} in your browser"),
//!         &["offline_access"],
//!     )?;
//! println!("token endpoint said {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod auth_code;
pub mod client;
pub mod client_credentials;
pub mod error;
pub mod http_client;
pub mod listener;
pub mod pkce;
pub mod query;
pub mod response;
mod types;
pub mod utils;

pub use client::{Client, ClientBuilder, client};
pub use error::{Error, ListenerError, Result};
pub use response::{Response, Status};

#[cfg(feature = "browser-open")]
pub use auth_code::open_system_browser;
