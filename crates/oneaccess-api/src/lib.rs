// oneaccess-api: Async Rust client for the OneAccess issuing authority
//
// Speaks the authority's JSON-over-HTTPS contract: session login, gate
// credential issuance, delegations and visitor passes. Domain policy
// (deadlines, retry, error taxonomy) lives in `oneaccess-core`.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod auth;
mod passes;

pub use client::AuthorityClient;
pub use error::Error;
pub use models::{
    DelegationRequest, DelegationResponse, LoginRequest, LoginResponse, TokenRequest,
    TokenResponse, VisitorPassRequest, VisitorPassResponse, VisitorTokenRequest,
    VisitorTokenResponse,
};
pub use transport::{TlsMode, TransportConfig};
