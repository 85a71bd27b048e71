//! Wiring from configuration to the three broker collaborators.

use pairbalance_broker::jupiter::{JupiterPriceClient, UltraSwapClient};
use pairbalance_broker::solana::{SolanaBalanceClient, Wallet};
use pairbalance_broker::{BalanceOracle, PriceOracle, SwapExecutor};

use crate::config::Config;
use crate::error::Result;

/// The collaborators a session talks to, plus the wallet they act for.
pub struct Gateways {
    pub prices: Box<dyn PriceOracle>,
    pub balances: Box<dyn BalanceOracle>,
    pub swaps: Box<dyn SwapExecutor>,
    /// Base58 address of the signing wallet.
    pub wallet: String,
}

impl Gateways {
    pub fn new(
        prices: impl PriceOracle + 'static,
        balances: impl BalanceOracle + 'static,
        swaps: impl SwapExecutor + 'static,
        wallet: impl Into<String>,
    ) -> Self {
        Self {
            prices: Box::new(prices),
            balances: Box::new(balances),
            swaps: Box::new(swaps),
            wallet: wallet.into(),
        }
    }
}

/// Build the Jupiter price client, Solana balance client and Ultra swap client.
///
/// Fails on an unusable keypair or HTTP client setup.
pub fn connect(config: &Config) -> Result<Gateways> {
    let wallet = Wallet::from_secret_bytes(&config.keypair_secret)?;
    let address = wallet.address();

    let prices = JupiterPriceClient::new(
        &config.settings.price.endpoint,
        config.price_timeout(),
        config.retry_policy(),
    )?;
    let balances = SolanaBalanceClient::new(&config.rpc_url);
    let swaps = UltraSwapClient::new(&config.settings.swap.endpoint, wallet, &config.rpc_url)?;

    Ok(Gateways::new(prices, balances, swaps, address))
}
