// Issuing authority HTTP client
//
// Wraps `reqwest::Client` with base-URL handling, bearer auth, and
// status/body decoding. Endpoint methods live next to the types they
// exchange (`auth.rs`, `passes.rs`); this module owns transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ErrorBody, TokenRequest, TokenResponse};
use crate::transport::TransportConfig;

/// Raw HTTP client for the issuing authority.
///
/// Stateless apart from the connection pool: cheap to clone and safe to
/// call concurrently from the card-emulation path and the refresh loop.
#[derive(Debug, Clone)]
pub struct AuthorityClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AuthorityClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the authority root (e.g. `https://access.example.com`
    /// or `https://host/oneaccess`). Trailing slashes are ignored.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The authority base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Request a gate-scoped credential: `POST {base}/qr/token`.
    ///
    /// A response without a usable `token` is reported as
    /// [`Error::Deserialization`]; the token itself stays opaque.
    pub async fn issue_token(
        &self,
        bearer: &SecretString,
        request: &TokenRequest,
    ) -> Result<TokenResponse, Error> {
        let url = self.endpoint_url("qr/token")?;
        let resp: TokenResponse = self.post(url, request, Some(bearer)).await?;
        if resp.token.trim().is_empty() {
            return Err(Error::Deserialization {
                message: "token field is empty".into(),
                body: String::new(),
            });
        }
        debug!(gate_id = %request.gate_id, exp = resp.exp_epoch_seconds, "credential issued");
        Ok(resp)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}`, preserving any path prefix on the base URL.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
        bearer: Option<&SecretString>,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let mut builder = self.http.post(url).json(body);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        let resp = builder.send().await.map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Map the HTTP status and decode the body.
    ///
    /// 401 and 403 both mean the authority refused this identity; every
    /// other non-success status is reported with the authority's message.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| preview(&body));

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(Error::Authentication { message });
            }
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(len = body.len(), "response body received");

        // Message carries the decode position only; the body may hold a credential.
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: decode_failure(&e),
            body: body.clone(),
        })
    }
}

fn decode_failure(err: &serde_json::Error) -> String {
    let kind = match err.classify() {
        Category::Io => "unreadable",
        Category::Syntax => "invalid JSON",
        Category::Data => "unexpected field shape",
        Category::Eof => "truncated",
    };
    format!("{kind} response body at line {} column {}", err.line(), err.column())
}

/// First 200 characters of a body, for error messages.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> AuthorityClient {
        AuthorityClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_url_trims_trailing_slash() {
        let c = client("https://access.example.com/");
        assert_eq!(
            c.endpoint_url("qr/token").unwrap().as_str(),
            "https://access.example.com/qr/token"
        );
    }

    #[test]
    fn endpoint_url_keeps_base_path() {
        let c = client("https://host.example.com/oneaccess///");
        assert_eq!(
            c.endpoint_url("/auth/login").unwrap().as_str(),
            "https://host.example.com/oneaccess/auth/login"
        );
    }
}
