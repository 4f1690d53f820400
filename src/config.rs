// ============================================================================
// Configuration des sources de cours
// ============================================================================
// Valeurs par défaut de production, surchargées par des variables
// d'environnement dans le binaire :
//   KURSBOARD_FEED_URL       URL de base du flux temps réel (absent = pas de flux)
//   KURSBOARD_FEED_PATH      chemin de la liste dans le flux ("currencies")
//   KURSBOARD_RATE_API_URL   endpoint des cours du jour
//   KURSBOARD_STATIC_FILE    fichier JSON local de secours
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::api::rate_api::DEFAULT_RATE_API_URL;
use crate::api::static_data::DEFAULT_STATIC_FILE;

/// Attente maximale du premier payload du flux temps réel
pub const FEED_WAIT: Duration = Duration::from_millis(5000);

/// Timeout de la requête vers l'API des cours
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_FEED_URL: &str = "KURSBOARD_FEED_URL";
pub const ENV_FEED_PATH: &str = "KURSBOARD_FEED_PATH";
pub const ENV_RATE_API_URL: &str = "KURSBOARD_RATE_API_URL";
pub const ENV_STATIC_FILE: &str = "KURSBOARD_STATIC_FILE";

/// Paramètres de la chaîne de sources
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// URL de base du flux (None : source sautée immédiatement)
    pub feed_url: Option<String>,
    pub feed_path: String,
    pub feed_wait: Duration,
    pub rate_api_url: String,
    pub http_timeout: Duration,
    pub static_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            feed_path: "currencies".to_string(),
            feed_wait: FEED_WAIT,
            rate_api_url: DEFAULT_RATE_API_URL.to_string(),
            http_timeout: HTTP_TIMEOUT,
            static_file: PathBuf::from(DEFAULT_STATIC_FILE),
        }
    }
}

impl SourceConfig {
    /// Lit la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applique les surcharges trouvées par `lookup` aux valeurs par défaut
    ///
    /// CONCEPT RUST : Closure en paramètre (impl Fn)
    /// - Permet de tester sans toucher aux variables d'environnement du process
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Une variable vide compte comme absente
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self::default();
        config.feed_url = get(ENV_FEED_URL);
        if let Some(path) = get(ENV_FEED_PATH) {
            config.feed_path = path;
        }
        if let Some(url) = get(ENV_RATE_API_URL) {
            config.rate_api_url = url;
        }
        if let Some(file) = get(ENV_STATIC_FILE) {
            config.static_file = PathBuf::from(file);
        }
        config
    }
}
