// ============================================================================
// Source 2 : API publique des cours du jour (CBR daily JSON)
// ============================================================================
// Récupère les cours officiels (sans écart) et synthétise les cours
// d'achat / vente du bureau avec un modèle d'écart fixe.
//
// Format de la réponse (extrait) :
// {
//   "Date": "2024-05-17T11:30:00+03:00",
//   "Valute": {
//     "USD": { "Nominal": 1, "Value": 90.9 },
//     "CNY": { "Nominal": 1, "Value": 12.55 },
//     ...
//   }
// }
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::error::LoadError;
use super::source::{RateOrigin, RateSource};
use crate::models::{CurrencyList, CurrencyRecord};

const SOURCE_ID: &str = "rate_api";

/// Endpoint public par défaut
pub const DEFAULT_RATE_API_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

// ============================================================================
// Modèle d'écart
// ============================================================================

/// Multiplicateurs appliqués au cours officiel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub buy: f64,
    pub sell: f64,
}

impl Spread {
    /// ±2 % : euro, dollar "blanc", livre, yuan
    pub const STANDARD: Spread = Spread { buy: 0.98, sell: 1.02 };

    /// ±5 % : dollar "bleu"
    pub const WIDE: Spread = Spread { buy: 0.95, sell: 1.05 };

    /// (achat, vente) pour un cours officiel ; (0, 0) si absent
    pub fn apply(&self, mid: Option<f64>) -> (f64, f64) {
        match mid {
            Some(mid) => (mid * self.buy, mid * self.sell),
            None => (0.0, 0.0),
        }
    }
}

// ============================================================================
// Structures JSON de la réponse
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DailyRates {
    date: Option<String>,
    #[serde(default)]
    valute: HashMap<String, ValuteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ValuteEntry {
    #[serde(default = "default_nominal")]
    nominal: f64,
    value: Option<f64>,
}

fn default_nominal() -> f64 {
    1.0
}

impl DailyRates {
    /// Cours officiel pour une unité de la devise
    ///
    /// CONCEPT RUST : Option chaining
    /// - get()? : devise absente -> None
    /// - filter : valeurs nulles, négatives ou non finies -> None
    fn mid_rate(&self, code: &str) -> Option<f64> {
        let entry = self.valute.get(code)?;
        let value = entry.value.filter(|v| v.is_finite() && *v > 0.0)?;
        let nominal = if entry.nominal.is_finite() && entry.nominal > 0.0 {
            entry.nominal
        } else {
            1.0
        };
        Some(value / nominal)
    }
}

// ============================================================================
// Synthèse des six enregistrements
// ============================================================================

/// Construit la liste du bureau à partir des cours officiels
///
/// - USD : deux canaux depuis le même cours (±2 % blanc, ±5 % bleu)
/// - EUR : ±2 %
/// - GBP, CNY : ±2 % mais toujours "cours par téléphone"
/// - RUB : unité fixe en fin de liste
fn synthesize_records(rates: &DailyRates) -> Result<Vec<CurrencyRecord>, LoadError> {
    let usd = rates.mid_rate("USD");
    let eur = rates.mid_rate("EUR");
    let gbp = rates.mid_rate("GBP");
    let cny = rates.mid_rate("CNY");

    if usd.is_none() && eur.is_none() && gbp.is_none() && cny.is_none() {
        return Err(LoadError::malformed(
            SOURCE_ID,
            "aucune des devises USD, EUR, GBP, CNY dans la réponse",
        ));
    }

    for (code, mid) in [("USD", usd), ("EUR", eur), ("GBP", gbp), ("CNY", cny)] {
        if mid.is_none() {
            warn!(currency = code, "Mid-rate missing from rate API response");
        }
    }

    let (white_buy, white_sell) = Spread::STANDARD.apply(usd);
    let (blue_buy, blue_sell) = Spread::WIDE.apply(usd);
    let (eur_buy, eur_sell) = Spread::STANDARD.apply(eur);
    let (gbp_buy, gbp_sell) = Spread::STANDARD.apply(gbp);
    let (cny_buy, cny_sell) = Spread::STANDARD.apply(cny);

    Ok(vec![
        CurrencyRecord::new("USD_WHITE", "us", "Доллар США (белый)", white_buy, white_sell, true),
        CurrencyRecord::new("USD_BLUE", "us", "Доллар США (синий)", blue_buy, blue_sell, true),
        CurrencyRecord::new("EUR", "eu", "Евро", eur_buy, eur_sell, true),
        CurrencyRecord::new("GBP", "gb", "Фунт стерлингов", gbp_buy, gbp_sell, false),
        CurrencyRecord::new("CNY", "cn", "Китайский юань", cny_buy, cny_sell, false),
        CurrencyRecord::rub_unit(),
    ])
}

/// Parse le corps de la réponse et synthétise la liste
fn parse_daily_rates(body: &str) -> Result<CurrencyList, LoadError> {
    let rates: DailyRates =
        serde_json::from_str(body).map_err(|e| LoadError::malformed(SOURCE_ID, e))?;

    if let Some(date) = rates.date.as_deref() {
        match DateTime::parse_from_rfc3339(date) {
            Ok(published) => debug!(published = %published, "Rate API publication date"),
            Err(e) => debug!(date, error = %e, "Unparseable rate API date"),
        }
    }

    let records = synthesize_records(&rates)?;
    CurrencyList::new(records).map_err(|e| LoadError::malformed(SOURCE_ID, e))
}

// ============================================================================
// RateSource
// ============================================================================

/// Source "API des cours du jour" de la chaîne
pub struct RateApiSource {
    client: reqwest::Client,
    url: String,
}

impl RateApiSource {
    /// Construit le client HTTP (timeout global sur la requête)
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::unavailable(SOURCE_ID, e))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RateSource for RateApiSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn origin(&self) -> RateOrigin {
        RateOrigin::RateApi
    }

    /// Une seule requête GET, sans relance
    #[instrument(skip(self), fields(url = %self.url))]
    async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
        debug!("Sending HTTP request to rate API");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Statut non-2xx : erreur reqwest, donc NetworkError
        let body = response.error_for_status()?.text().await?;

        let list = parse_daily_rates(&body)?;
        info!(currencies = list.len(), "Rate API delivered currencies");
        Ok(list)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{http_response, FakeServer};

    const SAMPLE: &str = r#"{
        "Date": "2024-05-17T11:30:00+03:00",
        "Valute": {
            "USD": { "CharCode": "USD", "Nominal": 1, "Value": 90.0 },
            "EUR": { "CharCode": "EUR", "Nominal": 1, "Value": 100.0 },
            "GBP": { "CharCode": "GBP", "Nominal": 1, "Value": 115.0 },
            "CNY": { "CharCode": "CNY", "Nominal": 10, "Value": 125.0 },
            "JPY": { "CharCode": "JPY", "Nominal": 100, "Value": 58.0 }
        }
    }"#;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_synthesizes_six_records_with_spreads() {
        let list = parse_daily_rates(SAMPLE).unwrap();
        assert_eq!(list.codes(), vec!["USD_WHITE", "USD_BLUE", "EUR", "GBP", "CNY", "RUB"]);

        let white = list.find("USD_WHITE").unwrap();
        assert!(approx(white.buy_rate, 88.2));
        assert!(approx(white.sell_rate, 91.8));

        let blue = list.find("USD_BLUE").unwrap();
        assert!(approx(blue.buy_rate, 85.5));
        assert!(approx(blue.sell_rate, 94.5));

        let eur = list.find("EUR").unwrap();
        assert!(approx(eur.buy_rate, 98.0));
        assert!(approx(eur.sell_rate, 102.0));

        let rub = list.find("RUB").unwrap();
        assert_eq!((rub.buy_rate, rub.sell_rate), (1.0, 1.0));
    }

    #[test]
    fn test_nominal_divides_value() {
        let list = parse_daily_rates(SAMPLE).unwrap();
        let cny = list.find("CNY").unwrap();
        // 125 / 10 = 12.5 par yuan
        assert!(approx(cny.buy_rate, 12.25));
        assert!(approx(cny.sell_rate, 12.75));
    }

    #[test]
    fn test_gbp_and_cny_always_phone_quote() {
        let list = parse_daily_rates(SAMPLE).unwrap();
        for code in ["GBP", "CNY"] {
            let record = list.find(code).unwrap();
            assert!(record.buy_rate > 0.0);
            assert!(!record.show_rates);
            assert!(!record.is_rate_eligible());
        }
    }

    #[test]
    fn test_missing_fields_are_zeroed() {
        let body = r#"{"Valute": {"USD": {"Nominal": 1, "Value": 90.0}}}"#;
        let list = parse_daily_rates(body).unwrap();

        for code in ["EUR", "GBP", "CNY"] {
            let record = list.find(code).unwrap();
            assert_eq!((record.buy_rate, record.sell_rate), (0.0, 0.0), "{}", code);
        }
        assert!(list.find("USD_WHITE").unwrap().is_rate_eligible());
    }

    #[test]
    fn test_unusable_responses_are_malformed() {
        for body in ["not json", "{}", r#"{"Valute": {"JPY": {"Nominal": 100, "Value": 58.0}}}"#] {
            let err = parse_daily_rates(body).unwrap_err();
            assert_eq!(err.kind(), "source_malformed", "{}", body);
        }
    }

    #[test]
    fn test_sell_never_below_buy() {
        let list = parse_daily_rates(SAMPLE).unwrap();
        for record in &list {
            assert!(record.sell_rate >= record.buy_rate, "{}", record.code);
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = FakeServer::start(http_response("200 OK", "application/json", SAMPLE), false).await;
        let source = RateApiSource::new(
            &format!("{}/daily_json.js", server.base_url),
            Duration::from_secs(5),
        )
        .unwrap();

        let list = source.attempt_load().await.unwrap();
        assert_eq!(list.len(), 6);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let server = FakeServer::start(
            http_response("503 Service Unavailable", "text/plain", "maintenance"),
            false,
        )
        .await;
        let source = RateApiSource::new(&server.base_url, Duration::from_secs(5)).unwrap();

        let err = source.attempt_load().await.unwrap_err();
        assert_eq!(err.kind(), "network_error");
    }

    #[tokio::test]
    async fn test_transport_error_is_network_error() {
        let source = RateApiSource::new("http://127.0.0.1:9/daily_json.js", Duration::from_secs(2)).unwrap();
        let err = source.attempt_load().await.unwrap_err();
        assert_eq!(err.kind(), "network_error");
    }
}
