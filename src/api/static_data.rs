// ============================================================================
// Source 3 : données statiques embarquées
// ============================================================================
// Dernier maillon de la chaîne : lit un fichier JSON local
// `{ "currencies": [...] }` et, s'il est absent ou invalide, retombe sur la
// table codée en dur. Cette source ne peut pas échouer.
// ============================================================================

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::error::LoadError;
use super::source::{RateOrigin, RateSource};
use crate::models::{CurrencyList, CurrencyRecord};

const SOURCE_ID: &str = "bundled";

/// Chemin par défaut du fichier de cours, relatif au répertoire courant
pub const DEFAULT_STATIC_FILE: &str = "data/currencies.json";

#[derive(Debug, Deserialize)]
struct StaticFile {
    currencies: Vec<CurrencyRecord>,
}

/// Table codée en dur : cours de secours du bureau
///
/// GBP et CNY sont toujours "cours par téléphone" (show_rates = false).
pub fn hardcoded_table() -> Vec<CurrencyRecord> {
    vec![
        CurrencyRecord::new("USD_WHITE", "us", "Доллар США (белый)", 95.5, 97.8, true),
        CurrencyRecord::new("USD_BLUE", "us", "Доллар США (синий)", 94.0, 96.5, true),
        CurrencyRecord::new("EUR", "eu", "Евро", 105.2, 107.9, true),
        CurrencyRecord::new("GBP", "gb", "Фунт стерлингов", 0.0, 0.0, false),
        CurrencyRecord::new("CNY", "cn", "Китайский юань", 0.0, 0.0, false),
        CurrencyRecord::rub_unit(),
    ]
}

/// La table codée en dur sous forme de liste validée
pub fn hardcoded_list() -> CurrencyList {
    CurrencyList::from_static(hardcoded_table())
}

/// Lit et valide le fichier de cours local
pub async fn read_static_file(path: &Path) -> Result<CurrencyList, LoadError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LoadError::parse(path, e))?;

    let file: StaticFile = serde_json::from_str(&content).map_err(|e| LoadError::parse(path, e))?;

    CurrencyList::new(file.currencies).map_err(|e| LoadError::parse(path, e))
}

/// Source "données statiques" : fichier local puis table codée en dur
pub struct BundledSource {
    path: PathBuf,
}

impl BundledSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Charge sans jamais échouer
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn load(&self) -> CurrencyList {
        match read_static_file(&self.path).await {
            Ok(list) => {
                info!(currencies = list.len(), "Loaded bundled rate file");
                list
            }
            Err(e) => {
                warn!(error = %e, "Bundled rate file unusable, using hardcoded table");
                hardcoded_list()
            }
        }
    }
}

#[async_trait]
impl RateSource for BundledSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn origin(&self) -> RateOrigin {
        RateOrigin::Bundled
    }

    async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
        Ok(self.load().await)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_hardcoded_table() {
        let list = hardcoded_list();
        assert_eq!(list.codes(), vec!["USD_WHITE", "USD_BLUE", "EUR", "GBP", "CNY", "RUB"]);

        let rub = list.find("RUB").unwrap();
        assert_eq!((rub.buy_rate, rub.sell_rate), (1.0, 1.0));

        // GBP / CNY : cours par téléphone
        assert!(!list.find("GBP").unwrap().is_rate_eligible());
        assert!(!list.find("CNY").unwrap().is_rate_eligible());
    }

    #[test]
    fn test_hardcoded_spread_is_non_negative() {
        for record in hardcoded_table() {
            assert!(record.sell_rate >= record.buy_rate, "{}", record.code);
        }
    }

    #[test]
    fn test_bundled_data_file_matches_schema() {
        let content = include_str!("../../data/currencies.json");
        let file: StaticFile = serde_json::from_str(content).unwrap();
        let list = CurrencyList::new(file.currencies).unwrap();

        assert_eq!(list.len(), 6);
        for record in &list {
            assert!(record.sell_rate >= record.buy_rate, "{}", record.code);
        }
    }

    #[tokio::test]
    async fn test_reads_valid_file() {
        let file = write_file(
            r#"{"currencies": [{"code": "EUR", "flag": "eu", "name": "Евро", "buy": 101.0, "sell": 103.0}]}"#,
        );

        let list = BundledSource::new(file.path()).attempt_load().await.unwrap();
        assert_eq!(list.codes(), vec!["EUR", "RUB"]);
        assert_eq!(list.find("EUR").unwrap().buy_rate, 101.0);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_hardcoded() {
        let dir = tempfile::tempdir().unwrap();
        let source = BundledSource::new(dir.path().join("absent.json"));

        let err = read_static_file(&dir.path().join("absent.json")).await.unwrap_err();
        assert_eq!(err.kind(), "parse_error");

        let list = source.attempt_load().await.unwrap();
        assert_eq!(list, hardcoded_list());
    }

    #[tokio::test]
    async fn test_invalid_files_fall_back_to_hardcoded() {
        for content in ["{ pas du json", r#"{"currencies": []}"#, r#"{"rates": {}}"#] {
            let file = write_file(content);
            let list = BundledSource::new(file.path()).load().await;
            assert_eq!(list.len(), 6, "{}", content);
        }
    }
}
