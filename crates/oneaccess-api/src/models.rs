// Wire types for the issuing authority's JSON contract.
//
// Field names follow the authority's camelCase schema. Response types
// only declare the fields this client reads; anything else is ignored.

use serde::{Deserialize, Serialize};

// ── Session login ────────────────────────────────────────────────

/// `POST /auth/login` body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
}

/// `POST /auth/login` success body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

// ── Gate credential ──────────────────────────────────────────────

/// `POST /qr/token` body, shared by the visual and card-emulation paths.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub gate_id: String,
    pub reader_nonce: String,
    pub device_id: String,
}

/// `POST /qr/token` success body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub exp_epoch_seconds: i64,
}

// ── Delegation ───────────────────────────────────────────────────

/// `POST /delegation/create` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRequest {
    pub delegatee_email: String,
    pub gate_ids: Vec<String>,
    pub hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationResponse {
    pub delegation_id: String,
}

// ── Visitor passes ───────────────────────────────────────────────

/// `POST /visitor/create` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorPassRequest {
    pub visitor_name: String,
    pub visitor_phone: String,
    pub gate_ids: Vec<String>,
    pub hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorPassResponse {
    pub pass_id: String,
}

/// `POST /visitor/token` body. Unauthenticated: the pass id is the capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorTokenRequest {
    pub pass_id: String,
    pub gate_id: String,
    pub reader_nonce: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorTokenResponse {
    pub token: String,
    pub exp_epoch_seconds: i64,
    pub visitor_name: String,
    pub remaining_uses: i64,
}

/// Error body shape used by the authority: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}
