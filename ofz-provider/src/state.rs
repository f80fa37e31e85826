use std::sync::Arc;

use ofz_oracle::cache::{PriceCache, RegisteredBondsCache};
use ofz_oracle::chain::ChainClient;
use ofz_oracle::config::ProviderConfig;
use ofz_oracle::exchange::ExchangeClient;
use ofz_oracle::nonce::NonceStore;
use ofz_oracle::resolver::PriceResolver;
use ofz_oracle::signing::Signer;

/// Everything a handler needs, shared across the Tokio worker pool.
pub struct AppState {
    pub config: ProviderConfig,
    pub exchange: Arc<dyn ExchangeClient>,
    pub resolver: PriceResolver,
    pub price_cache: PriceCache,
    pub bond_cache: RegisteredBondsCache,
    pub nonce_store: NonceStore,
    pub signer: Signer,
    pub chain: ChainClient,
}
