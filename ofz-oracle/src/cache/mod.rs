pub mod bond_cache;
pub mod price_cache;

pub use bond_cache::RegisteredBondsCache;
pub use price_cache::PriceCache;
