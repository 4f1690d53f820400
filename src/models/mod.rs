// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// ============================================================================

pub mod currency;      // Enregistrement d'une devise (currency.rs)
pub mod currency_list; // Liste validée des devises (currency_list.rs)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use kursboard::models::currency::CurrencyRecord;
// On peut faire : use kursboard::models::CurrencyRecord;
pub use currency::{CurrencyRecord, PHONE_QUOTE_CODES, RUB_CODE, USD_LABEL};
pub use currency_list::{is_rub_code, CurrencyList, ListError};
