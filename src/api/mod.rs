// ============================================================================
// Module : api
// ============================================================================
// Ce module contient les sources de cours et la chaîne qui les essaie dans
// l'ordre : flux temps réel → API des cours du jour → données statiques
// ============================================================================

pub mod error;       // Taxonomie des échecs de chargement
pub mod live_feed;   // Flux temps réel (Firebase, SSE)
pub mod rate_api;    // API publique des cours du jour
pub mod source;      // Trait RateSource + SourceChain
pub mod static_data; // Fichier local + table codée en dur

#[cfg(test)]
pub(crate) mod test_support;

// Re-export des types principaux
pub use error::LoadError;
pub use live_feed::{FirebaseFeed, LiveFeed, LiveFeedSource, Subscription};
pub use rate_api::RateApiSource;
pub use source::{LoadedRates, RateOrigin, RateSource, SourceChain};
pub use static_data::{hardcoded_list, BundledSource};
