// ============================================================================
// Politique d'affichage du tableau des cours
// ============================================================================
// Projection pure de la liste : pour chaque devise (sauf le rouble), soit
// les cours formatés, soit le texte "cours par téléphone".
//
// Aucune dépendance à l'interface : le même résultat sert au TUI et aux tests.
// ============================================================================

use crate::models::{CurrencyList, CurrencyRecord};

/// Remplace un cours non communiqué
pub const RATE_PLACEHOLDER: &str = "—";

/// Invitation affichée à la place des cours
pub const CONTACT_PROMPT: &str = "Уточняйте курс по телефону";

/// Numéro du bureau
pub const CONTACT_PHONE: &str = "+7 (961) 626-99-99";

/// Message quand aucune liste n'a pu être chargée
pub const UNAVAILABLE_MESSAGE: &str = "Не удалось загрузить курсы. Позвоните нам";

/// Formate un montant en roubles : "95.50 ₽"
pub fn format_rub(amount: f64) -> String {
    format!("{:.2} ₽", amount)
}

/// Ce qui est affiché dans la partie "cours" d'une carte
#[derive(Debug, Clone, PartialEq)]
pub enum RateQuote {
    /// Cours numériques formatés
    Rates { buy: String, sell: String },

    /// Cours sur demande : tirets + invitation à appeler
    CallForRate {
        buy: &'static str,
        sell: &'static str,
        prompt: &'static str,
        phone: &'static str,
    },
}

impl RateQuote {
    fn call_for_rate() -> Self {
        RateQuote::CallForRate {
            buy: RATE_PLACEHOLDER,
            sell: RATE_PLACEHOLDER,
            prompt: CONTACT_PROMPT,
            phone: CONTACT_PHONE,
        }
    }

    /// (achat, vente) tels qu'affichés
    pub fn buy_sell(&self) -> (&str, &str) {
        match self {
            RateQuote::Rates { buy, sell } => (buy.as_str(), sell.as_str()),
            RateQuote::CallForRate { buy, sell, .. } => (*buy, *sell),
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, RateQuote::Rates { .. })
    }
}

/// Une carte du tableau des cours
#[derive(Debug, Clone, PartialEq)]
pub struct RateCard {
    pub code: String,
    /// Ticker normalisé ("USD" pour les deux canaux dollar)
    pub label: String,
    pub display_name: String,
    pub flag_region: String,
    pub quote: RateQuote,
}

impl RateCard {
    /// Projette un enregistrement
    pub fn from_record(record: &CurrencyRecord) -> Self {
        let quote = if record.is_rate_eligible() {
            RateQuote::Rates {
                buy: format_rub(record.buy_rate),
                sell: format_rub(record.sell_rate),
            }
        } else {
            RateQuote::call_for_rate()
        };

        Self {
            code: record.code.clone(),
            label: record.display_code().to_string(),
            display_name: record.display_name.clone(),
            flag_region: record.flag_region.clone(),
            quote,
        }
    }
}

/// État du tableau : cartes, ou message "impossible de charger"
#[derive(Debug, Clone, PartialEq)]
pub enum BoardState {
    Cards(Vec<RateCard>),
    Unavailable { message: &'static str, phone: &'static str },
}

/// Cartes de toutes les devises du tableau (rouble exclu)
pub fn rate_cards(list: &CurrencyList) -> Vec<RateCard> {
    list.board_records().map(RateCard::from_record).collect()
}

/// État complet du tableau pour une liste
pub fn board_state(list: &CurrencyList) -> BoardState {
    if list.is_empty() {
        BoardState::Unavailable {
            message: UNAVAILABLE_MESSAGE,
            phone: CONTACT_PHONE,
        }
    } else {
        BoardState::Cards(rate_cards(list))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
