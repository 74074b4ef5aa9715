// Session login
//
// Exchanges an email for the bearer token that authorizes credential
// issuance. The token is returned to the caller and never cached here.

use secrecy::SecretString;
use tracing::debug;

use crate::client::AuthorityClient;
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse};

impl AuthorityClient {
    /// Sign in: `POST {base}/auth/login`.
    ///
    /// The authority answers 403 for unknown or inactive accounts, which
    /// surfaces as [`Error::Authentication`].
    pub async fn login(&self, email: &str) -> Result<SecretString, Error> {
        let url = self.endpoint_url("auth/login")?;
        debug!("logging in at {}", url);

        let body = LoginRequest {
            email: email.trim().to_owned(),
        };
        let resp: LoginResponse = self.post(url, &body, None).await?;

        if resp.access_token.is_empty() {
            return Err(Error::Deserialization {
                message: "accessToken field is empty".into(),
                body: String::new(),
            });
        }

        debug!("login successful");
        Ok(SecretString::from(resp.access_token))
    }
}
