// ============================================================================
// Calculateur de conversion
// ============================================================================
// Conversion entre deux devises via le rouble, avec les cours du bureau :
// - la devise de départ est prise au cours de VENTE
// - la devise d'arrivée est prise au cours d'ACHAT
//
//   RUB -> X      : montant / achat(X)
//   X   -> RUB    : montant * vente(X)
//   X   -> Y      : montant * vente(X) / achat(Y)
//
// Ne retourne jamais d'erreur : une saisie invalide vaut 0 ("entrez un
// montant"), un code inconnu prend un cours de 1.
// ============================================================================

use std::fmt;

use tracing::warn;

use crate::models::{is_rub_code, CurrencyList, CurrencyRecord, RUB_CODE};

/// Affiché à la place du résultat tant qu'aucun montant n'est saisi
pub const ENTER_AMOUNT_PLACEHOLDER: &str = "~";

/// Résultat du calculateur
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Pas de montant (vide, 0, ou non numérique)
    EnterAmount,

    /// Montant converti et ticker de la devise d'arrivée
    Amount { value: f64, label: String },
}

impl Conversion {
    pub fn value(&self) -> Option<f64> {
        match self {
            Conversion::Amount { value, .. } => Some(*value),
            Conversion::EnterAmount => None,
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::EnterAmount => f.write_str(ENTER_AMOUNT_PLACEHOLDER),
            Conversion::Amount { value, label } => write!(f, "{:.2} {}", value, label),
        }
    }
}

// ============================================================================
// Saisie du montant
// ============================================================================

/// Interprète une saisie libre comme un montant
///
/// - prend le plus long préfixe numérique ("12.5 €" -> 12.5, "1e3" -> 1000)
/// - la virgule est acceptée comme séparateur décimal ("12,5" -> 12.5)
/// - vide, non numérique, négatif ou non fini -> 0
pub fn parse_amount(text: &str) -> f64 {
    let normalized = text.trim().replace(',', ".");
    match numeric_prefix(&normalized).parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let integer_digits = digits_from(end);
    end += integer_digits;

    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = digits_from(end + 1);
        end += 1 + fraction_digits;
    }

    // Sans aucun chiffre ("", ".", "-") il n'y a pas de nombre
    if integer_digits + fraction_digits == 0 {
        return "";
    }

    // Exposant : gardé seulement s'il est suivi d'au moins un chiffre
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = digits_from(exponent);
        if exponent_digits > 0 {
            end = exponent + exponent_digits;
        }
    }

    &text[..end]
}

// ============================================================================
// Conversion
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Side {
    Buy,
    Sell,
}

/// Cours d'une devise, ou 1 si le code est inconnu ou le cours non positif
fn rate_or_unit(list: &CurrencyList, code: &str, side: Side) -> f64 {
    let Some(record) = list.find(code) else {
        warn!(code, side = ?side, "Unknown currency code in conversion, using rate 1");
        return 1.0;
    };

    let rate = match side {
        Side::Buy => record.buy_rate,
        Side::Sell => record.sell_rate,
    };

    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        1.0
    }
}

/// Convertit `amount` de `from_code` vers `to_code`
pub fn convert(amount: f64, from_code: &str, to_code: &str, list: &CurrencyList) -> Conversion {
    if !(amount.is_finite() && amount > 0.0) {
        return Conversion::EnterAmount;
    }

    let value = if is_rub_code(from_code) {
        amount / rate_or_unit(list, to_code, Side::Buy)
    } else if is_rub_code(to_code) {
        amount * rate_or_unit(list, from_code, Side::Sell)
    } else {
        // Passage par le rouble
        let in_rub = amount * rate_or_unit(list, from_code, Side::Sell);
        in_rub / rate_or_unit(list, to_code, Side::Buy)
    };

    let label = list
        .find(to_code)
        .map(|record| record.display_code().to_string())
        .unwrap_or_else(|| to_code.to_string());

    Conversion::Amount { value, label }
}

// ============================================================================
// État du calculateur
// ============================================================================

/// Saisie et sélections courantes du calculateur
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorState {
    pub amount_text: String,
    pub from_code: String,
    pub to_code: String,
}

impl CalculatorState {
    /// Saisie vide ; la devise de départ est fixée au premier `reconcile`
    pub fn new() -> Self {
        Self {
            amount_text: String::new(),
            from_code: String::new(),
            to_code: RUB_CODE.to_string(),
        }
    }

    pub fn amount(&self) -> f64 {
        parse_amount(&self.amount_text)
    }

    /// Résultat pour la liste donnée
    pub fn result(&self, list: &CurrencyList) -> Conversion {
        convert(self.amount(), &self.from_code, &self.to_code, list)
    }

    /// Réaligne les sélections sur une nouvelle liste
    ///
    /// Une sélection dont le code existe toujours est conservée ; sinon la
    /// devise de départ revient à la première du tableau et celle d'arrivée
    /// au rouble. Une liste vide ne touche à rien.
    pub fn reconcile(&mut self, list: &CurrencyList) {
        if list.is_empty() {
            return;
        }

        if !list.contains(&self.from_code) {
            self.from_code = default_from(list);
        }
        if !list.contains(&self.to_code) {
            self.to_code = RUB_CODE.to_string();
        }
    }

    /// Devise de départ suivante / précédente dans la liste
    pub fn cycle_from(&mut self, list: &CurrencyList, forward: bool) {
        if let Some(code) = cycle(list, &self.from_code, forward) {
            self.from_code = code;
        }
    }

    /// Devise d'arrivée suivante / précédente dans la liste
    pub fn cycle_to(&mut self, list: &CurrencyList, forward: bool) {
        if let Some(code) = cycle(list, &self.to_code, forward) {
            self.to_code = code;
        }
    }

    /// Inverse départ et arrivée
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from_code, &mut self.to_code);
    }
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self::new()
    }
}

fn default_from(list: &CurrencyList) -> String {
    list.board_records()
        .next()
        .or_else(|| list.iter().next())
        .map(|record: &CurrencyRecord| record.code.clone())
        .unwrap_or_default()
}

fn cycle(list: &CurrencyList, current: &str, forward: bool) -> Option<String> {
    let codes = list.codes();
    if codes.is_empty() {
        return None;
    }

    let next = match codes.iter().position(|code| *code == current) {
        Some(i) if forward => (i + 1) % codes.len(),
        Some(i) => (i + codes.len() - 1) % codes.len(),
        None => 0,
    };
    Some(codes[next].to_string())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::hardcoded_list;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn find_buy(code: &str, list: &CurrencyList) -> f64 {
        list.find(code).unwrap().buy_rate
    }

    fn find_sell(code: &str, list: &CurrencyList) -> f64 {
        list.find(code).unwrap().sell_rate
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100"), 100.0);
        assert_eq!(parse_amount("  12.5 "), 12.5);
        assert_eq!(parse_amount("12,5"), 12.5);
        assert_eq!(parse_amount("12.5 EUR"), 12.5);
        assert_eq!(parse_amount(".5"), 0.5);
    }

    #[test]
    fn test_parse_amount_accepts_exponent() {
        assert_eq!(parse_amount("1e3"), 1000.0);
        assert_eq!(parse_amount("2.5E-1"), 0.25);
        assert_eq!(parse_amount("1E+2 RUB"), 100.0);
        // Exposant sans chiffre : seule la mantisse compte
        assert_eq!(parse_amount("1e"), 1.0);
        assert_eq!(parse_amount("1e+"), 1.0);
        assert_eq!(parse_amount("3,5eur"), 3.5);
        // Débordement vers l'infini
        assert_eq!(parse_amount("1e400"), 0.0);
    }

    #[test]
    fn test_parse_amount_degenerate_inputs_are_zero() {
        for text in ["", "   ", "abc", ".", "-5", "-", "+", "EUR 12"] {
            assert_eq!(parse_amount(text), 0.0, "{:?}", text);
        }
    }

    #[test]
    fn test_zero_amount_is_placeholder_not_zero() {
        let list = hardcoded_list();
        for (from, to) in [("RUB", "EUR"), ("EUR", "RUB"), ("EUR", "USD_BLUE"), ("XXX", "YYY")] {
            let result = convert(0.0, from, to, &list);
            assert_eq!(result, Conversion::EnterAmount);
            assert_eq!(result.to_string(), "~");
            assert_eq!(result.value(), None);
        }
    }

    #[test]
    fn test_from_rub_divides_by_target_buy() {
        let list = hardcoded_list();
        let result = convert(1000.0, "RUB", "USD_BLUE", &list);
        assert!(approx(result.value().unwrap(), 1000.0 / find_buy("USD_BLUE", &list)));
    }

    #[test]
    fn test_to_rub_multiplies_by_source_sell() {
        let list = hardcoded_list();
        let result = convert(100.0, "USD_BLUE", "RUB", &list);
        assert!(approx(result.value().unwrap(), 100.0 * find_sell("USD_BLUE", &list)));
        assert_eq!(result.to_string(), "9650.00 RUB");
    }

    #[test]
    fn test_cross_conversion_bridges_through_rub() {
        let list = hardcoded_list();
        let result = convert(50.0, "EUR", "USD_BLUE", &list);
        let expected = (50.0 * find_sell("EUR", &list)) / find_buy("USD_BLUE", &list);

        assert!(approx(result.value().unwrap(), expected));
        // Le ticker affiché est normalisé
        assert_eq!(result.to_string(), format!("{:.2} USD", expected));
    }

    #[test]
    fn test_unknown_codes_default_rate_to_one() {
        let list = hardcoded_list();

        // Départ inconnu : vente = 1
        let result = convert(10.0, "XAU", "RUB", &list);
        assert!(approx(result.value().unwrap(), 10.0));

        // Arrivée inconnue : achat = 1, libellé = code brut
        let result = convert(10.0, "EUR", "XAU", &list);
        assert!(approx(result.value().unwrap(), 10.0 * find_sell("EUR", &list)));
        assert_eq!(result.to_string(), format!("{:.2} XAU", 10.0 * find_sell("EUR", &list)));

        // Liste vide : conversion identité
        let result = convert(10.0, "EUR", "USD_BLUE", &CurrencyList::empty());
        assert!(approx(result.value().unwrap(), 10.0));
    }

    #[test]
    fn test_zero_rate_defaults_to_one() {
        // GBP est à 0 dans la table de secours
        let list = hardcoded_list();
        let result = convert(10.0, "RUB", "GBP", &list);
        assert!(approx(result.value().unwrap(), 10.0));
    }

    #[test]
    fn test_calculator_state_reconcile() {
        let list = hardcoded_list();
        let mut state = CalculatorState::new();

        state.reconcile(&list);
        assert_eq!(state.from_code, "USD_WHITE");
        assert_eq!(state.to_code, "RUB");

        // Sélections existantes conservées
        state.from_code = "EUR".to_string();
        state.to_code = "USD_BLUE".to_string();
        state.reconcile(&list);
        assert_eq!((state.from_code.as_str(), state.to_code.as_str()), ("EUR", "USD_BLUE"));

        // Codes disparus : retour aux valeurs par défaut
        let smaller = CurrencyList::new(vec![CurrencyRecord::new("CNY", "cn", "Китайский юань", 12.0, 13.0, true)]).unwrap();
        state.reconcile(&smaller);
        assert_eq!((state.from_code.as_str(), state.to_code.as_str()), ("CNY", "RUB"));

        // Liste vide : rien ne change
        state.reconcile(&CurrencyList::empty());
        assert_eq!(state.from_code, "CNY");
    }

    #[test]
    fn test_calculator_state_result_and_cycle() {
        let list = hardcoded_list();
        let mut state = CalculatorState::new();
        state.reconcile(&list);

        assert_eq!(state.result(&list), Conversion::EnterAmount);

        state.amount_text = "100".to_string();
        assert!(approx(state.result(&list).value().unwrap(), 9780.0));

        state.cycle_from(&list, true);
        assert_eq!(state.from_code, "USD_BLUE");
        state.cycle_from(&list, false);
        state.cycle_from(&list, false);
        assert_eq!(state.from_code, "RUB");

        state.cycle_to(&list, true);
        assert_eq!(state.to_code, "USD_WHITE");

        state.swap();
        assert_eq!((state.from_code.as_str(), state.to_code.as_str()), ("USD_WHITE", "RUB"));
    }
}
