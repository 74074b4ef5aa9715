// Delegations and visitor passes
//
// Account-holder operations that grant other people access, plus the
// unauthenticated visitor credential endpoint.

use secrecy::SecretString;
use tracing::debug;

use crate::client::AuthorityClient;
use crate::error::Error;
use crate::models::{
    DelegationRequest, DelegationResponse, VisitorPassRequest, VisitorPassResponse,
    VisitorTokenRequest, VisitorTokenResponse,
};

impl AuthorityClient {
    /// Delegate gate access to another account: `POST {base}/delegation/create`.
    pub async fn create_delegation(
        &self,
        bearer: &SecretString,
        request: &DelegationRequest,
    ) -> Result<String, Error> {
        let url = self.endpoint_url("delegation/create")?;
        let resp: DelegationResponse = self.post(url, request, Some(bearer)).await?;
        debug!(delegation_id = %resp.delegation_id, "delegation created");
        Ok(resp.delegation_id)
    }

    /// Create a time-boxed visitor pass: `POST {base}/visitor/create`.
    pub async fn create_visitor_pass(
        &self,
        bearer: &SecretString,
        request: &VisitorPassRequest,
    ) -> Result<String, Error> {
        let url = self.endpoint_url("visitor/create")?;
        let resp: VisitorPassResponse = self.post(url, request, Some(bearer)).await?;
        debug!(pass_id = %resp.pass_id, "visitor pass created");
        Ok(resp.pass_id)
    }

    /// Request a credential for a visitor pass: `POST {base}/visitor/token`.
    pub async fn issue_visitor_token(
        &self,
        request: &VisitorTokenRequest,
    ) -> Result<VisitorTokenResponse, Error> {
        let url = self.endpoint_url("visitor/token")?;
        let resp: VisitorTokenResponse = self.post(url, request, None).await?;
        if resp.token.trim().is_empty() {
            return Err(Error::Deserialization {
                message: "token field is empty".into(),
                body: String::new(),
            });
        }
        debug!(
            gate_id = %request.gate_id,
            remaining_uses = resp.remaining_uses,
            "visitor credential issued"
        );
        Ok(resp)
    }
}
