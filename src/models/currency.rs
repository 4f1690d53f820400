// ============================================================================
// Structure : CurrencyRecord
// ============================================================================
// Représente une devise négociée au guichet (achat / vente en roubles)
//
// CONCEPTS RUST :
// 1. #[serde(rename = "...")] : le format JSON (fichier statique, flux temps
//    réel) garde les noms courts "buy", "sell", "flag", "name"
// 2. #[serde(default)] : un champ absent prend une valeur par défaut au lieu
//    de faire échouer la désérialisation
// 3. Méthodes &self : requêtes dérivées sans modifier l'enregistrement
// ============================================================================

use serde::{Deserialize, Serialize};

/// Code du rouble, unité de compte de toutes les conversions
pub const RUB_CODE: &str = "RUB";

/// Ticker commun aux deux canaux de dollars en espèces
pub const USD_LABEL: &str = "USD";

/// Devises toujours cotées par téléphone dans ce bureau
pub const PHONE_QUOTE_CODES: [&str; 2] = ["GBP", "CNY"];

/// Marqueurs des deux canaux USD dans le nom affiché ("белый" / "синий")
const USD_CHANNEL_MARKERS: [&str; 2] = ["белый", "синий"];

fn default_show_rates() -> bool {
    true
}

/// Une devise avec ses cours d'achat et de vente
///
/// Les cours sont exprimés en roubles pour une unité de la devise.
/// Un cours à 0 signifie "inconnu / indisponible".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRecord {
    /// Identifiant unique dans la liste (ex: "USD_WHITE", "EUR")
    pub code: String,

    /// Code pays ISO pour retrouver le drapeau (ex: "us", "eu")
    #[serde(rename = "flag", default)]
    pub flag_region: String,

    /// Nom complet en russe (ex: "Доллар США (белый)")
    #[serde(rename = "name", default)]
    pub display_name: String,

    /// Roubles payés par le bureau quand le client vend cette devise
    #[serde(rename = "buy", default)]
    pub buy_rate: f64,

    /// Roubles demandés par le bureau quand le client achète cette devise
    #[serde(rename = "sell", default)]
    pub sell_rate: f64,

    /// Forçage du chemin "cours par téléphone" quand false
    #[serde(rename = "showRates", default = "default_show_rates")]
    pub show_rates: bool,
}

impl CurrencyRecord {
    /// Constructeur complet
    ///
    /// CONCEPT RUST : impl Into<String>
    /// - Accepte &str comme String sans .to_string() côté appelant
    pub fn new(
        code: impl Into<String>,
        flag_region: impl Into<String>,
        display_name: impl Into<String>,
        buy_rate: f64,
        sell_rate: f64,
        show_rates: bool,
    ) -> Self {
        Self {
            code: code.into(),
            flag_region: flag_region.into(),
            display_name: display_name.into(),
            buy_rate,
            sell_rate,
            show_rates,
        }
    }

    /// L'enregistrement unité du rouble (achat = vente = 1)
    pub fn rub_unit() -> Self {
        Self::new(RUB_CODE, "ru", "Российский рубль", 1.0, 1.0, true)
    }

    /// Vérifie si c'est l'enregistrement du rouble
    pub fn is_rub(&self) -> bool {
        self.code == RUB_CODE
    }

    /// Retourne le ticker normalisé présenté à l'utilisateur
    ///
    /// Les deux canaux de dollars (blanc et bleu) sont deux enregistrements
    /// distincts avec des écarts différents, mais s'affichent tous deux "USD".
    pub fn display_code(&self) -> &str {
        let name = self.display_name.to_lowercase();
        if USD_CHANNEL_MARKERS.iter().any(|marker| name.contains(marker)) {
            USD_LABEL
        } else {
            self.code.as_str()
        }
    }

    /// Indique si les cours numériques doivent être affichés
    ///
    /// GBP et CNY ne sont affichés que si `show_rates` l'autorise ET qu'un
    /// cours positif existe. Les autres devises ne dépendent que du cours.
    pub fn is_rate_eligible(&self) -> bool {
        if PHONE_QUOTE_CODES.contains(&self.code.as_str()) {
            self.show_rates && self.buy_rate > 0.0
        } else {
            self.buy_rate > 0.0
        }
    }

    /// Écart vente - achat, si les deux cours sont renseignés
    pub fn spread(&self) -> Option<f64> {
        if self.buy_rate > 0.0 && self.sell_rate > 0.0 {
            Some(self.sell_rate - self.buy_rate)
        } else {
            None
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
