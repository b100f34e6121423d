use serde::Serialize;

/// `grant_type` values understood by the token endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TokenGrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
}

/// Access token request body, RFC 6749 §4.1.3 with the RFC 7636 §4.5 verifier.
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequestParameters<'a> {
    pub grant_type: TokenGrantType,
    pub client_id: &'a str,
    pub code_verifier: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
}

/// Refresh request body, RFC 6749 §6.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequestParameters<'a> {
    pub grant_type: TokenGrantType,
    pub refresh_token: &'a str,
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Client credentials request body, RFC 6749 §4.4.2.
///
/// The client authenticates through the `Authorization` header; credentials
/// never appear in the body (RFC 6749 §2.3.1).
#[derive(Debug, Serialize)]
pub(crate) struct ClientCredentialsParameters {
    pub grant_type: TokenGrantType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Space-join requested scopes, or `None` when none were requested so the
/// parameter is omitted entirely.
pub(crate) fn join_scopes(scopes: &[&str]) -> Option<String> {
    if scopes.is_empty() {
        None
    } else {
        Some(scopes.join(" "))
    }
}
