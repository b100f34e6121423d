use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http_client::HttpClient;
use crate::types::{ClientCredentialsParameters, TokenGrantType, join_scopes};

/// Client credentials grant (RFC 6749 §4.4) authenticating through HTTP
/// Basic (RFC 6749 §2.3.1).
///
/// The `Authorization` header is precomputed at construction; the secret
/// itself is not retained.
pub struct ClientCredentialsGrant {
    client: Client,
    basic_auth_header: String,
}

impl ClientCredentialsGrant {
    pub(crate) fn new(client: Client, client_secret: &str) -> Self {
        let basic_auth_header = build_basic_auth_header(client.client_id(), client_secret);
        Self {
            client,
            basic_auth_header,
        }
    }

    /// Request an access token using the pre-shared client credentials.
    ///
    /// The token endpoint's response is returned verbatim, whatever its
    /// status.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(client_id = %self.client.client_id()))
    )]
    pub fn authorize<C: HttpClient>(
        &self,
        http: &C,
        scopes: &[&str],
    ) -> Result<http::Response<Vec<u8>>> {
        let request = self.build_token_request(scopes)?;
        http.send_http(request).map_err(Error::http)
    }

    /// Like [`authorize`](Self::authorize), but run on a blocking worker of
    /// the current tokio runtime.
    #[cfg(feature = "tokio")]
    pub async fn authorize_async<C>(self, http: C, scopes: &[&str]) -> Result<http::Response<Vec<u8>>>
    where
        C: HttpClient + Send + Sync + 'static,
    {
        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
            self.authorize(&http, &scopes)
        })
        .await
        .map_err(Error::Worker)?
    }

    fn build_token_request(&self, scopes: &[&str]) -> Result<http::Request<Vec<u8>>> {
        let body = serde_html_form::to_string(ClientCredentialsParameters {
            grant_type: TokenGrantType::ClientCredentials,
            scope: join_scopes(scopes),
        })?;
        let mut request = self.client.build_token_request(body)?;
        // RFC 6749 §2.3.1: the server MUST support Basic; credentials in the
        // request body are NOT RECOMMENDED and stay out of ours entirely.
        let value =
            header::HeaderValue::from_str(&self.basic_auth_header).map_err(http::Error::from)?;
        request.headers_mut().insert(header::AUTHORIZATION, value);
        Ok(request)
    }
}

/// `"Basic " + base64(client_id ":" client_secret)`, RFC 2617 style.
///
/// The finished header string inevitably stays in memory for the lifetime of
/// the grant; every intermediate buffer holding secret material is wiped
/// before it is dropped.
fn build_basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let mut user_pass = Vec::with_capacity(client_id.len() + 1 + client_secret.len());
    user_pass.extend_from_slice(client_id.as_bytes());
    user_pass.push(b':');
    user_pass.extend_from_slice(client_secret.as_bytes());

    let encoded = STANDARD.encode(&user_pass);
    scrub(&mut user_pass);

    let header = format!("Basic {encoded}");
    let mut encoded = encoded.into_bytes();
    scrub(&mut encoded);
    header
}

/// Overwrite a buffer so dropped copies of secret material do not linger on
/// the heap. `black_box` keeps the wipe from being optimized out.
fn scrub(buf: &mut [u8]) {
    buf.fill(0);
    std::hint::black_box(&*buf);
}
