use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    config::JupiterConfig,
    decompile::{decompile_versioned_transaction, lookup_table_addresses},
    quote::{QuoteRequest, QuoteResponse},
    swap::{SwapRequest, SwapResponse, SwapResult},
    wallet::{SendTransactionRequest, WalletClient},
    ClientError, JupiterClient,
};

/// The two aggregator endpoints the service talks to.
#[async_trait]
pub trait JupiterApi: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ClientError>;

    async fn swap(&self, request: &SwapRequest) -> Result<SwapResponse, ClientError>;
}

pub struct JupiterService<A = JupiterClient> {
    api: A,
    config: JupiterConfig,
}

impl JupiterService {
    pub fn new(config: JupiterConfig) -> Result<Self, ClientError> {
        let api = JupiterClient::new(&config)?;
        Ok(Self::with_api(api, config))
    }
}

impl<A: JupiterApi> JupiterService<A> {
    pub fn with_api(api: A, config: JupiterConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &JupiterConfig {
        &self.config
    }

    pub async fn get_quote(&self, parameters: &QuoteRequest) -> Result<QuoteResponse, ClientError> {
        self.api.quote(parameters).await
    }

    /// Quotes, fetches the swap transaction for the quote, and hands its
    /// instructions to `wallet` to sign and broadcast.
    pub async fn swap_tokens(
        &self,
        wallet: &dyn WalletClient,
        parameters: &QuoteRequest,
    ) -> Result<SwapResult, ClientError> {
        let quote = self.get_quote(parameters).await?;
        debug!(
            in_amount = quote.in_amount,
            out_amount = quote.out_amount,
            steps = quote.route_plan.len(),
            "quote received"
        );

        let swap = self
            .api
            .swap(&SwapRequest {
                user_public_key: wallet.get_address(),
                quote_response: quote,
                dynamic_compute_unit_limit: self.config.dynamic_compute_unit_limit,
                prioritization_fee_lamports: self.config.prioritization_fee,
            })
            .await?;

        let transaction = swap.decode_transaction()?;
        let instructions = decompile_versioned_transaction(
            wallet.get_connection(),
            &transaction,
            self.config.lookup_table_policy(),
        )
        .await?;
        let address_lookup_table_addresses = lookup_table_addresses(&transaction.message);
        debug!(
            instructions = instructions.len(),
            lookup_tables = address_lookup_table_addresses.len(),
            "swap transaction decompiled"
        );

        let sent = wallet
            .send_transaction(SendTransactionRequest {
                instructions,
                address_lookup_table_addresses,
            })
            .await
            .map_err(ClientError::Wallet)?;

        info!(hash = %sent.hash, "swap transaction sent");
        Ok(SwapResult { hash: sent.hash })
    }
}
