// ============================================================================
// Chaîne de sources de cours
// ============================================================================
// Essaie les sources dans un ordre strict et s'arrête au premier succès :
//   1. flux temps réel (5 s max)
//   2. API publique des cours du jour
//   3. données statiques embarquées (ne peut pas échouer)
//
// CONCEPTS RUST :
// 1. Trait objects : Vec<Box<dyn RateSource>> pour des stratégies hétérogènes
// 2. async_trait : `async fn` dans un trait utilisable en trait object
// 3. Les erreurs sont consommées ici : l'appelant reçoit toujours une liste
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{debug, info, instrument, warn};

use super::error::LoadError;
use super::live_feed::{FirebaseFeed, LiveFeed, LiveFeedSource};
use super::rate_api::RateApiSource;
use super::static_data::BundledSource;
use crate::config::SourceConfig;
use crate::models::CurrencyList;

/// Provenance d'une liste de cours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    /// Flux temps réel du bureau
    LiveFeed,
    /// Cours du jour publiés (avec écart synthétique)
    RateApi,
    /// Fichier local ou table codée en dur
    Bundled,
}

impl RateOrigin {
    /// Libellé affiché dans l'en-tête
    pub fn label(&self) -> &'static str {
        match self {
            RateOrigin::LiveFeed => "онлайн",
            RateOrigin::RateApi => "курс ЦБ",
            RateOrigin::Bundled => "резервные данные",
        }
    }
}

impl fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            RateOrigin::LiveFeed => "live_feed",
            RateOrigin::RateApi => "rate_api",
            RateOrigin::Bundled => "bundled",
        };
        f.write_str(id)
    }
}

/// Résultat d'un chargement : la liste, sa provenance et l'heure
///
/// `origin == None` signifie qu'aucune liste n'a été obtenue (état vide).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRates {
    pub list: CurrencyList,
    pub origin: Option<RateOrigin>,
    pub loaded_at: DateTime<Local>,
}

impl LoadedRates {
    pub fn new(list: CurrencyList, origin: RateOrigin) -> Self {
        Self {
            list,
            origin: Some(origin),
            loaded_at: Local::now(),
        }
    }

    /// État vide : démarrage, ou toutes les sources épuisées
    pub fn empty() -> Self {
        Self {
            list: CurrencyList::empty(),
            origin: None,
            loaded_at: Local::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

// ============================================================================
// Trait : RateSource
// ============================================================================

/// Une source de cours essayée par la chaîne
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Identifiant court pour les logs ("live_feed", "rate_api", ...)
    fn id(&self) -> &'static str;

    /// Provenance rapportée quand cette source gagne
    fn origin(&self) -> RateOrigin;

    /// Une seule tentative de chargement, sans relance
    async fn attempt_load(&self) -> Result<CurrencyList, LoadError>;
}

// ============================================================================
// Structure : SourceChain
// ============================================================================

/// Liste ordonnée de sources, essayées l'une après l'autre
pub struct SourceChain {
    sources: Vec<Box<dyn RateSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Construit la chaîne de production : flux → API → statique
    ///
    /// Un flux non configuré (ou dont le client ne se construit pas) reste
    /// dans la chaîne : il échoue immédiatement en `SourceUnavailable`.
    pub fn from_config(config: &SourceConfig) -> Self {
        let feed: Option<std::sync::Arc<dyn LiveFeed>> = match &config.feed_url {
            Some(url) => match FirebaseFeed::new(url) {
                Ok(feed) => Some(std::sync::Arc::new(feed)),
                Err(e) => {
                    warn!(error = %e, "Could not build live feed client");
                    None
                }
            },
            None => None,
        };

        let rate_api: Box<dyn RateSource> =
            match RateApiSource::new(&config.rate_api_url, config.http_timeout) {
                Ok(source) => Box::new(source),
                Err(e) => {
                    warn!(error = %e, "Could not build rate API client");
                    Box::new(UnavailableSource::new("rate_api", RateOrigin::RateApi, e.to_string()))
                }
            };

        Self::new(vec![
            Box::new(LiveFeedSource::new(feed, &config.feed_path, config.feed_wait)),
            rate_api,
            Box::new(BundledSource::new(&config.static_file)),
        ])
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Charge la liste des devises depuis la première source qui réussit
    ///
    /// Les sources sont attendues une par une, jamais en parallèle.
    /// Si toutes échouent (impossible avec la source statique en fin de
    /// chaîne), retourne l'état vide.
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn load_currencies(&self) -> LoadedRates {
        for source in &self.sources {
            debug!(source = source.id(), "Attempting rate source");

            match source.attempt_load().await {
                Ok(list) => {
                    info!(
                        source = source.id(),
                        currencies = list.len(),
                        "Rate source succeeded"
                    );
                    return LoadedRates::new(list, source.origin());
                }
                Err(e) => {
                    warn!(
                        source = source.id(),
                        kind = e.kind(),
                        error = %e,
                        "Rate source failed, trying next"
                    );
                }
            }
        }

        warn!("All rate sources exhausted, leaving list empty");
        LoadedRates::empty()
    }
}

/// Place-tenant pour une source dont le client n'a pas pu être construit
struct UnavailableSource {
    id: &'static str,
    origin: RateOrigin,
    reason: String,
}

impl UnavailableSource {
    fn new(id: &'static str, origin: RateOrigin, reason: String) -> Self {
        Self { id, origin, reason }
    }
}

#[async_trait]
impl RateSource for UnavailableSource {
    fn id(&self) -> &'static str {
        self.id
    }

    fn origin(&self) -> RateOrigin {
        self.origin
    }

    async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
        Err(LoadError::unavailable(self.id, &self.reason))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurrencyRecord;
    use std::sync::{Arc, Mutex};

    /// Source factice qui enregistre ses appels dans un journal partagé
    struct ScriptedSource {
        id: &'static str,
        origin: RateOrigin,
        succeed: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl RateSource for ScriptedSource {
        fn id(&self) -> &'static str {
            self.id
        }

        fn origin(&self) -> RateOrigin {
            self.origin
        }

        async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
            self.calls.lock().unwrap().push(self.id);
            if self.succeed {
                let eur = CurrencyRecord::new("EUR", "eu", "Евро", 100.0, 102.0, true);
                Ok(CurrencyList::new(vec![eur]).unwrap())
            } else {
                Err(LoadError::malformed(self.id, "échec scripté"))
            }
        }
    }

    fn scripted(
        id: &'static str,
        origin: RateOrigin,
        succeed: bool,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn RateSource> {
        Box::new(ScriptedSource {
            id,
            origin,
            succeed,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_success() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = SourceChain::new(vec![
            scripted("live_feed", RateOrigin::LiveFeed, false, &calls),
            scripted("rate_api", RateOrigin::RateApi, true, &calls),
            scripted("bundled", RateOrigin::Bundled, true, &calls),
        ]);

        let loaded = chain.load_currencies().await;

        assert_eq!(loaded.origin, Some(RateOrigin::RateApi));
        assert_eq!(*calls.lock().unwrap(), vec!["live_feed", "rate_api"]);
        assert!(loaded.list.contains("EUR"));
        assert!(loaded.list.contains("RUB"));
    }

    #[tokio::test]
    async fn test_chain_exhausted_returns_empty_state() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let chain = SourceChain::new(vec![
            scripted("live_feed", RateOrigin::LiveFeed, false, &calls),
            scripted("rate_api", RateOrigin::RateApi, false, &calls),
        ]);

        let loaded = chain.load_currencies().await;

        assert!(loaded.is_empty());
        assert_eq!(loaded.origin, None);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_production_chain_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let config = SourceConfig {
            feed_url: None,
            // Port 9 (discard) sur localhost : connexion refusée tout de suite
            rate_api_url: "http://127.0.0.1:9/daily_json.js".to_string(),
            static_file: dir.path().join("absent.json"),
            ..SourceConfig::default()
        };

        let chain = SourceChain::from_config(&config);
        assert_eq!(chain.len(), 3);

        let loaded = chain.load_currencies().await;
        assert_eq!(loaded.origin, Some(RateOrigin::Bundled));
        assert_eq!(loaded.list.len(), 6);
    }

    /// Laisse l'horloge en pause pendant la source enveloppée, puis la
    /// relance : les sources suivantes font de vraies E/S réseau
    struct ResumeClockAfter(Box<dyn RateSource>);

    #[async_trait]
    impl RateSource for ResumeClockAfter {
        fn id(&self) -> &'static str {
            self.0.id()
        }

        fn origin(&self) -> RateOrigin {
            self.0.origin()
        }

        async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
            let result = self.0.attempt_load().await;
            tokio::time::resume();
            result
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_feed_then_failing_api_falls_back_to_bundled() {
        use crate::api::test_support::{http_response, FakeServer, MemoryFeed};
        use crate::api::{BundledSource, LiveFeedSource, RateApiSource};
        use crate::config::FEED_WAIT;

        let feed = Arc::new(MemoryFeed::silent());
        let server = FakeServer::start(
            http_response("503 Service Unavailable", "text/plain", "maintenance"),
            false,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();

        let chain = SourceChain::new(vec![
            Box::new(ResumeClockAfter(Box::new(LiveFeedSource::new(
                Some(feed.clone()),
                "currencies",
                FEED_WAIT,
            )))),
            Box::new(
                RateApiSource::new(
                    &format!("{}/daily_json.js", server.base_url),
                    std::time::Duration::from_secs(5),
                )
                .unwrap(),
            ),
            Box::new(BundledSource::new(dir.path().join("absent.json"))),
        ]);

        let started = tokio::time::Instant::now();
        let loaded = chain.load_currencies().await;

        // Le flux a attendu toute la borne, puis s'est désabonné
        assert!(started.elapsed() >= FEED_WAIT);
        assert!(feed.all_unsubscribed());

        // L'API a bien été essayée une fois (503), puis la table de secours
        assert_eq!(server.hits(), 1);
        assert_eq!(loaded.origin, Some(RateOrigin::Bundled));
        assert_eq!(loaded.list.len(), 6);
        let rub = loaded.list.find("RUB").unwrap();
        assert_eq!((rub.buy_rate, rub.sell_rate), (1.0, 1.0));
    }

    #[test]
    fn test_origin_labels() {
        assert_eq!(RateOrigin::LiveFeed.to_string(), "live_feed");
        assert_eq!(RateOrigin::Bundled.label(), "резервные данные");
        assert!(LoadedRates::empty().is_empty());
    }
}
