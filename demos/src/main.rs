use std::{str::FromStr, sync::Arc};

use jupiter_swap_plugin::{
    quote::{QuoteRequest, SwapMode},
    rpc::{KeypairWallet, RpcConnection},
    tools::call_tool,
    JupiterConfig, JupiterPlugin, WalletClient,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const SWAP_AMOUNT: u64 = 100_000_000;
const SLIPPAGE_BPS: u16 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::from_path("demos/.env").ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let private_key = std::env::var("PRIVATE_KEY")
        .map_err(|_| anyhow::anyhow!("PRIVATE_KEY environment variable must be set (base58 encoded)"))?;
    let rpc_url = std::env::var("RPC_URL")
        .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string());
    let send_tx = std::env::var("JUPITER_SEND_TX")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let keypair = Keypair::from_base58_string(&private_key);
    info!(wallet = %keypair.pubkey(), "loaded keypair");

    let config = JupiterConfig::from_env()?;
    let plugin = JupiterPlugin::new(config)?;
    info!(plugin = plugin.name(), api_url = %plugin.service().config().api_url, "plugin ready");
    let wallet: Arc<dyn WalletClient> = Arc::new(KeypairWallet::new(
        keypair,
        RpcConnection::new(rpc_url),
    ));

    let request = QuoteRequest {
        input_mint: Pubkey::from_str(SOL_MINT)?,
        output_mint: Pubkey::from_str(USDC_MINT)?,
        amount: SWAP_AMOUNT,
        slippage_bps: Some(SLIPPAGE_BPS),
        swap_mode: Some(SwapMode::ExactIn),
        max_accounts: Some(50),
        ..Default::default()
    };

    let quote = plugin.service().get_quote(&request).await?;
    println!(
        "Quote: {:.2} SOL -> {:.2} USDC ({} bps slippage, {} step{})",
        SWAP_AMOUNT as f64 / 1e9,
        quote.out_amount as f64 / 1e6,
        quote.slippage_bps,
        quote.route_plan.len(),
        if quote.route_plan.len() == 1 { "" } else { "s" }
    );

    if !send_tx {
        println!("\nSet JUPITER_SEND_TX=true to actually send the transaction");
        return Ok(());
    }

    let tools = plugin.tools();
    let result = call_tool(
        &tools,
        "swap_tokens",
        wallet,
        serde_json::to_value(&request)?,
    )
    .await?;

    let hash = result["hash"].as_str().unwrap_or_default();
    println!("\nTransaction sent: {}", hash);
    println!("Explorer: https://solscan.io/tx/{}", hash);

    Ok(())
}
