//! External collaborators over HTTP
//!
//! - `http` - Payment provider and wallet backend adapters
//! - `responses` - One parser per external call

pub mod http;
pub mod responses;

pub use http::{
    HttpBackend, HttpBackendConfig, HttpGateway, HttpGatewayConfig, DEFAULT_GATEWAY_URL,
    DEFAULT_HTTP_TIMEOUT,
};
