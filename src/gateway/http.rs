//! HTTP adapters for the payment provider and the wallet backend
//!
//! [`HttpGateway`] speaks to a Paystack-style provider: amounts travel in
//! minor units and requests carry the secret key as a bearer token.
//! [`HttpBackend`] reads charge rules, balances and transactions from the
//! wallet backend.
//!
//! Transport failures, timeouts, `429` and `5xx` answers become
//! [`WalletError::GatewayUnavailable`]; any other unexpected answer becomes
//! [`WalletError::MalformedResponse`]. Bodies are decoded by
//! [`crate::gateway::responses`].

use crate::core::traits::{BalanceSource, ChargeRuleSource, PaymentGateway, TransactionFeed};
use crate::gateway::responses::{
    self, BALANCE_ENDPOINT, CHARGES_ENDPOINT, INITIALIZE_ENDPOINT, TRANSACTIONS_ENDPOINT,
    VERIFY_ENDPOINT,
};
use crate::types::{
    ChargeRule, GatewayAuthorization, GatewayStatus, InitiateRequest, OwnerId, Reference,
    Transaction, WalletError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GATEWAY_URL: &str = "https://api.paystack.co";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the payment provider
#[derive(Clone, PartialEq)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGatewayConfig")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            secret_key: String::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl HttpGatewayConfig {
    /// Create a config, falling back to defaults for a blank URL or a zero
    /// timeout
    pub fn new(base_url: Option<String>, secret_key: impl Into<String>, timeout_ms: u64) -> Self {
        let base_url = match base_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => url,
            None => DEFAULT_GATEWAY_URL.to_string(),
        };

        let timeout = if timeout_ms == 0 {
            warn!(
                "Invalid gateway timeout ({}ms), using default ({}ms)",
                timeout_ms,
                DEFAULT_HTTP_TIMEOUT.as_millis()
            );
            DEFAULT_HTTP_TIMEOUT
        } else {
            Duration::from_millis(timeout_ms)
        };

        Self {
            base_url,
            secret_key: secret_key.into(),
            timeout,
        }
    }
}

/// Connection settings for the wallet backend
#[derive(Debug, Clone, PartialEq)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn build_client(timeout: Duration) -> Result<Client, WalletError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WalletError::gateway_unavailable(format!("Failed to build HTTP client: {}", e)))
}

/// Join path segments onto a base URL, percent-encoding each segment
fn endpoint_url(base: &Url, endpoint: &str, segments: &[&str]) -> Result<Url, WalletError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| WalletError::malformed_response(endpoint, "base URL cannot have a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_base_url(base_url: &str) -> Result<Url, WalletError> {
    Url::parse(base_url)
        .map_err(|e| WalletError::gateway_unavailable(format!("Invalid URL '{}': {}", base_url, e)))
}

/// Send a request and return the body of a successful answer
async fn send(request: RequestBuilder, endpoint: &str) -> Result<Vec<u8>, WalletError> {
    let response = request.send().await.map_err(|e| {
        warn!(endpoint, error = %e, "request failed");
        if e.is_timeout() {
            WalletError::gateway_unavailable(format!("{} timed out", endpoint))
        } else {
            WalletError::gateway_unavailable(format!("{}: {}", endpoint, e))
        }
    })?;

    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        warn!(endpoint, %status, "upstream unavailable");
        return Err(WalletError::gateway_unavailable(format!(
            "{} answered {}",
            endpoint, status
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| WalletError::gateway_unavailable(format!("{}: {}", endpoint, e)))?
        .to_vec();

    if !status.is_success() {
        return Err(WalletError::malformed_response(
            endpoint,
            format!("unexpected status {}", status),
        ));
    }

    debug!(endpoint, %status, bytes = body.len(), "response received");
    Ok(body)
}

/// Convert a major-unit amount to the provider's minor units
fn to_minor_units(request: &InitiateRequest) -> Result<String, WalletError> {
    request
        .total
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.round().to_string())
        .ok_or_else(|| WalletError::arithmetic_overflow("minor units", &request.owner_id))
}

/// Payment provider adapter
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl HttpGateway {
    pub fn new(config: &HttpGatewayConfig) -> Result<Self, WalletError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: parse_base_url(&config.base_url)?,
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn initiate(
        &self,
        request: &InitiateRequest,
    ) -> Result<GatewayAuthorization, WalletError> {
        let url = endpoint_url(
            &self.base_url,
            INITIALIZE_ENDPOINT,
            &["transaction", "initialize"],
        )?;

        let mut body = serde_json::json!({
            "amount": to_minor_units(request)?,
            "reference": request.reference.as_str(),
            "metadata": { "owner_id": request.owner_id.as_str() },
        });
        if let Some(callback_url) = &request.callback_url {
            body["callback_url"] = serde_json::Value::from(callback_url.as_str());
        }

        debug!(reference = %request.reference, total = %request.total, "initializing payment");
        let raw = send(
            self.client
                .post(url)
                .bearer_auth(&self.secret_key)
                .json(&body),
            INITIALIZE_ENDPOINT,
        )
        .await?;

        responses::parse_initialize(&raw)
    }

    async fn verify(&self, reference: &Reference) -> Result<GatewayStatus, WalletError> {
        let url = endpoint_url(
            &self.base_url,
            VERIFY_ENDPOINT,
            &["transaction", "verify", reference.as_str()],
        )?;

        let raw = send(
            self.client.get(url).bearer_auth(&self.secret_key),
            VERIFY_ENDPOINT,
        )
        .await?;

        responses::parse_verify(reference, &raw)
    }
}

/// Wallet backend adapter
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &HttpBackendConfig) -> Result<Self, WalletError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: parse_base_url(&config.base_url)?,
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ChargeRuleSource for HttpBackend {
    async fn active_charge_rules(&self, category: &str) -> Result<Vec<ChargeRule>, WalletError> {
        let url = endpoint_url(&self.base_url, CHARGES_ENDPOINT, &["charges", "active"])?;
        let raw = send(
            self.get(url).query(&[("category", category)]),
            CHARGES_ENDPOINT,
        )
        .await?;
        responses::parse_charge_rules(&raw)
    }
}

#[async_trait]
impl BalanceSource for HttpBackend {
    async fn wallet_balance(&self, owner: &OwnerId) -> Result<Decimal, WalletError> {
        let url = endpoint_url(
            &self.base_url,
            BALANCE_ENDPOINT,
            &["wallet", owner.as_str(), "balance"],
        )?;
        let raw = send(self.get(url), BALANCE_ENDPOINT).await?;
        responses::parse_wallet_balance(&raw)
    }
}

#[async_trait]
impl TransactionFeed for HttpBackend {
    async fn user_transactions(&self, owner: &OwnerId) -> Result<Vec<Transaction>, WalletError> {
        let url = endpoint_url(
            &self.base_url,
            TRANSACTIONS_ENDPOINT,
            &["wallet", owner.as_str(), "transactions"],
        )?;
        let raw = send(self.get(url), TRANSACTIONS_ENDPOINT).await?;
        responses::parse_transactions(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn request(total: Decimal) -> InitiateRequest {
        InitiateRequest {
            owner_id: OwnerId::from("parent-1"),
            reference: Reference::from("FUND-1"),
            total,
            callback_url: None,
        }
    }

    #[rstest]
    #[case(dec!(10150), "1015000")]
    #[case(dec!(100.5), "10050")]
    #[case(dec!(0.015), "2")]
    fn test_minor_units(#[case] total: Decimal, #[case] expected: &str) {
        assert_eq!(to_minor_units(&request(total)).unwrap(), expected);
    }

    #[test]
    fn test_minor_units_overflow_is_an_error() {
        let err = to_minor_units(&request(Decimal::MAX)).unwrap_err();
        assert!(matches!(err, WalletError::ArithmeticOverflow { .. }));
    }

    #[rstest]
    #[case::no_trailing_slash("https://api.example.com", "https://api.example.com/transaction/verify/R-1")]
    #[case::trailing_slash("https://api.example.com/", "https://api.example.com/transaction/verify/R-1")]
    #[case::prefix("https://api.example.com/v1", "https://api.example.com/v1/transaction/verify/R-1")]
    fn test_endpoint_url(#[case] base: &str, #[case] expected: &str) {
        let url = endpoint_url(
            &Url::parse(base).unwrap(),
            VERIFY_ENDPOINT,
            &["transaction", "verify", "R-1"],
        )
        .unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let base = Url::parse("https://backend.example").unwrap();
        let url = endpoint_url(&base, BALANCE_ENDPOINT, &["wallet", "a/b c", "balance"]).unwrap();
        assert_eq!(url.as_str(), "https://backend.example/wallet/a%2Fb%20c/balance");
    }

    #[rstest]
    #[case::defaults(None, 0, DEFAULT_GATEWAY_URL, DEFAULT_HTTP_TIMEOUT)]
    #[case::blank_url(Some("  "), 500, DEFAULT_GATEWAY_URL, Duration::from_millis(500))]
    #[case::custom(Some("http://localhost:9000"), 2000, "http://localhost:9000", Duration::from_secs(2))]
    fn test_gateway_config(
        #[case] base_url: Option<&str>,
        #[case] timeout_ms: u64,
        #[case] expected_url: &str,
        #[case] expected_timeout: Duration,
    ) {
        let config = HttpGatewayConfig::new(base_url.map(str::to_string), "sk_test", timeout_ms);
        assert_eq!(config.base_url, expected_url);
        assert_eq!(config.timeout, expected_timeout);
    }

    #[test]
    fn test_gateway_config_debug_hides_secret() {
        let config = HttpGatewayConfig::new(None, "sk_live_secret", 1000);
        assert!(!format!("{:?}", config).contains("sk_live_secret"));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = HttpGatewayConfig::new(Some("not a url".to_string()), "sk", 1000);
        assert!(HttpGateway::new(&config).is_err());
    }
}
