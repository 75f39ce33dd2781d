use crate::quote::{QuoteRequest, QuoteResponse};
use crate::swap::{SwapRequest, SwapResponse};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub mod config;
pub mod decompile;
pub mod quote;
pub mod rpc;
pub mod serde_helpers;
pub mod service;
pub mod swap;
pub mod tools;
pub mod wallet;

pub use config::JupiterConfig;
pub use decompile::{DecompileError, LookupTablePolicy};
pub use service::{JupiterApi, JupiterService};
pub use tools::{Chain, JupiterPlugin, Tool};
pub use wallet::{Connection, SendTransactionRequest, SentTransaction, WalletClient};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed with status {status}: {body}")]
    RequestFailed {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to get quote: {message}")]
    Quote {
        message: String,
        error_code: Option<String>,
    },
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to decode base64 transaction: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to deserialize transaction: {0}")]
    TransactionDecode(#[from] bincode::Error),
    #[error("Failed to decompile transaction: {0}")]
    Decompile(#[from] DecompileError),
    #[error(transparent)]
    Connection(anyhow::Error),
    #[error(transparent)]
    Wallet(anyhow::Error),
    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid parameters for tool {tool}: {source}")]
    InvalidToolParameters {
        tool: &'static str,
        source: serde_json::Error,
    },
}

/// Error body the aggregator returns alongside a non-success status.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    error_code: Option<String>,
}

pub struct JupiterClient {
    client: reqwest::Client,
    base_path: String,
    api_key: Option<String>,
}

impl JupiterClient {
    pub fn new(config: &JupiterConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_path: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ClientError> {
        let params = build_query_params(request);
        debug!(
            input_mint = %request.input_mint,
            output_mint = %request.output_mint,
            amount = request.amount,
            "requesting quote"
        );

        let response = self
            .authorize(self.client.get(format!("{}/quote", self.base_path)))
            .query(&params)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = check_quote_response(response).await?;
        let buffer = response.bytes().await?;
        Ok(serde_json::from_slice(&buffer)?)
    }

    pub async fn swap(&self, request: &SwapRequest) -> Result<SwapResponse, ClientError> {
        debug!(user = %request.user_public_key, "requesting swap transaction");

        let response = self
            .authorize(self.client.post(format!("{}/swap", self.base_path)))
            .json(request)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = check_response(response).await?;
        let buffer = response.bytes().await?;
        Ok(serde_json::from_slice(&buffer)?)
    }
}

#[async_trait]
impl JupiterApi for JupiterClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ClientError> {
        JupiterClient::quote(self, request).await
    }

    async fn swap(&self, request: &SwapRequest) -> Result<SwapResponse, ClientError> {
        JupiterClient::swap(self, request).await
    }
}

fn build_query_params(request: &QuoteRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("inputMint", request.input_mint.to_string()),
        ("outputMint", request.output_mint.to_string()),
        ("amount", request.amount.to_string()),
    ];

    if let Some(slippage_bps) = request.slippage_bps {
        params.push(("slippageBps", slippage_bps.to_string()));
    }
    if let Some(swap_mode) = request.swap_mode {
        params.push(("swapMode", swap_mode.to_string()));
    }
    if let Some(ref dexes) = request.dexes {
        params.push(("dexes", dexes.join(",")));
    }
    if let Some(ref exclude_dexes) = request.exclude_dexes {
        params.push(("excludeDexes", exclude_dexes.join(",")));
    }
    if let Some(restrict) = request.restrict_intermediate_tokens {
        params.push(("restrictIntermediateTokens", restrict.to_string()));
    }
    if let Some(only_direct_routes) = request.only_direct_routes {
        params.push(("onlyDirectRoutes", only_direct_routes.to_string()));
    }
    if let Some(as_legacy_transaction) = request.as_legacy_transaction {
        params.push(("asLegacyTransaction", as_legacy_transaction.to_string()));
    }
    if let Some(platform_fee_bps) = request.platform_fee_bps {
        params.push(("platformFeeBps", platform_fee_bps.to_string()));
    }
    if let Some(max_accounts) = request.max_accounts {
        params.push(("maxAccounts", max_accounts.to_string()));
    }

    params
}

async fn check_response(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    Err(ClientError::RequestFailed { status, body })
}

async fn check_quote_response(response: Response) -> Result<Response, ClientError> {
    check_response(response).await.map_err(into_quote_error)
}

/// Turns a failed quote call with a structured body into [`ClientError::Quote`].
/// Anything else passes through untouched.
fn into_quote_error(err: ClientError) -> ClientError {
    match err {
        ClientError::RequestFailed { status, body } => {
            match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(ApiErrorBody { error, error_code }) => ClientError::Quote {
                    message: error,
                    error_code,
                },
                Err(_) => ClientError::RequestFailed { status, body },
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use reqwest::StatusCode;
    use solana_sdk::pubkey::Pubkey;

    use super::*;
    use crate::quote::SwapMode;

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn base_request() -> QuoteRequest {
        QuoteRequest {
            input_mint: Pubkey::from_str(SOL_MINT).unwrap(),
            output_mint: Pubkey::from_str(USDC_MINT).unwrap(),
            amount: 100_000_000,
            slippage_bps: Some(50),
            ..Default::default()
        }
    }

    #[test]
    fn query_params_cover_required_fields_only_by_default() {
        let params = build_query_params(&base_request());
        assert_eq!(
            params,
            vec![
                ("inputMint", SOL_MINT.to_string()),
                ("outputMint", USDC_MINT.to_string()),
                ("amount", "100000000".to_string()),
                ("slippageBps", "50".to_string()),
            ]
        );
    }

    #[test]
    fn query_params_leave_out_unset_slippage() {
        let request = QuoteRequest {
            slippage_bps: None,
            ..base_request()
        };
        let params = build_query_params(&request);

        assert_eq!(params.len(), 3);
        assert!(!params.iter().any(|(k, _)| *k == "slippageBps"));
    }

    #[test]
    fn query_params_include_optional_routing_fields() {
        let request = QuoteRequest {
            swap_mode: Some(SwapMode::ExactOut),
            dexes: Some(vec!["Orca V2".to_string(), "Raydium".to_string()]),
            only_direct_routes: Some(true),
            max_accounts: Some(40),
            ..base_request()
        };
        let params = build_query_params(&request);

        assert!(params.contains(&("swapMode", "ExactOut".to_string())));
        assert!(params.contains(&("dexes", "Orca V2,Raydium".to_string())));
        assert!(params.contains(&("onlyDirectRoutes", "true".to_string())));
        assert!(params.contains(&("maxAccounts", "40".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "excludeDexes"));
    }

    #[test]
    fn structured_quote_failure_carries_remote_message() {
        let err = into_quote_error(ClientError::RequestFailed {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"Could not find any route","errorCode":"COULD_NOT_FIND_ANY_ROUTE"}"#
                .to_string(),
        });

        match &err {
            ClientError::Quote {
                message,
                error_code,
            } => {
                assert_eq!(message, "Could not find any route");
                assert_eq!(error_code.as_deref(), Some("COULD_NOT_FIND_ANY_ROUTE"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Failed to get quote: Could not find any route");
    }

    #[test]
    fn unstructured_failure_passes_through() {
        let err = into_quote_error(ClientError::RequestFailed {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        });

        assert!(matches!(
            err,
            ClientError::RequestFailed { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
    }

    fn http_response(status: u16, body: &str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn quote_response_with_error_body_becomes_quote_error() {
        let response = http_response(
            400,
            r#"{"error":"The token is not tradable","errorCode":"TOKEN_NOT_TRADABLE"}"#,
        );

        let err = check_quote_response(response).await.unwrap_err();

        match &err {
            ClientError::Quote {
                message,
                error_code,
            } => {
                assert_eq!(message, "The token is not tradable");
                assert_eq!(error_code.as_deref(), Some("TOKEN_NOT_TRADABLE"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn quote_response_without_error_body_keeps_status() {
        let response = http_response(503, "upstream overloaded");

        let err = check_quote_response(response).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::RequestFailed { status, ref body }
                if status == StatusCode::SERVICE_UNAVAILABLE && body == "upstream overloaded"
        ));
    }

    #[tokio::test]
    async fn successful_response_passes_through() {
        let response = http_response(200, "{}");

        let response = check_quote_response(response).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "{}");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let config = JupiterConfig {
            api_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let client = JupiterClient::new(&config).unwrap();
        assert_eq!(client.base_path, "http://localhost:8080");
        assert!(client.api_key.is_none());
    }
}
