use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::JupiterConfig, quote::QuoteRequest, service::JupiterApi, wallet::WalletClient,
    ClientError, JupiterClient, JupiterService,
};

pub type ToolFuture = BoxFuture<'static, Result<Value, ClientError>>;
pub type ToolHandler = Arc<dyn Fn(Arc<dyn WalletClient>, Value) -> ToolFuture + Send + Sync>;

/// A named operation an agent can invoke with JSON parameters.
#[derive(Clone)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: ToolHandler,
}

impl Tool {
    pub async fn call(
        &self,
        wallet: Arc<dyn WalletClient>,
        parameters: Value,
    ) -> Result<Value, ClientError> {
        (self.handler)(wallet, parameters).await
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Looks up `name` in `tools` and invokes it.
pub async fn call_tool(
    tools: &[Tool],
    name: &str,
    wallet: Arc<dyn WalletClient>,
    parameters: Value,
) -> Result<Value, ClientError> {
    let tool = tools
        .iter()
        .find(|tool| tool.name == name)
        .ok_or_else(|| ClientError::UnknownTool(name.to_string()))?;
    tool.call(wallet, parameters).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Solana,
    Evm,
}

pub struct JupiterPlugin<A = JupiterClient> {
    service: Arc<JupiterService<A>>,
}

impl JupiterPlugin {
    pub fn new(config: JupiterConfig) -> Result<Self, ClientError> {
        Ok(Self::from_service(JupiterService::new(config)?))
    }
}

impl<A: JupiterApi + 'static> JupiterPlugin<A> {
    pub const NAME: &'static str = "jupiter";

    pub fn from_service(service: JupiterService<A>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn service(&self) -> &JupiterService<A> {
        &self.service
    }

    pub fn supports_chain(&self, chain: Chain) -> bool {
        chain == Chain::Solana
    }

    pub fn tools(&self) -> Vec<Tool> {
        let quote_service = Arc::clone(&self.service);
        let swap_service = Arc::clone(&self.service);

        vec![
            Tool {
                name: "get_quote",
                description: "Get a quote for a swap on the Jupiter DEX",
                handler: Arc::new(
                    move |_wallet: Arc<dyn WalletClient>, parameters: Value| -> ToolFuture {
                        let service = Arc::clone(&quote_service);
                        Box::pin(async move {
                            let request: QuoteRequest =
                                parse_parameters("get_quote", parameters)?;
                            let quote = service.get_quote(&request).await?;
                            Ok(serde_json::to_value(quote)?)
                        })
                    },
                ),
            },
            Tool {
                name: "swap_tokens",
                description: "Swap an SPL token for another token on the Jupiter DEX",
                handler: Arc::new(
                    move |wallet: Arc<dyn WalletClient>, parameters: Value| -> ToolFuture {
                        let service = Arc::clone(&swap_service);
                        Box::pin(async move {
                            let request: QuoteRequest =
                                parse_parameters("swap_tokens", parameters)?;
                            let result = service.swap_tokens(wallet.as_ref(), &request).await?;
                            Ok(serde_json::to_value(result)?)
                        })
                    },
                ),
            },
        ]
    }
}

fn parse_parameters<T: DeserializeOwned>(
    tool: &'static str,
    parameters: Value,
) -> Result<T, ClientError> {
    serde_json::from_value(parameters)
        .map_err(|source| ClientError::InvalidToolParameters { tool, source })
}
