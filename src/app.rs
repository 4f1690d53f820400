// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Arc<LoadedRates> : l'App garde un snapshot du dépôt, jamais une copie
//    partielle de la liste
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::api::LoadedRates;
use crate::calculator::{CalculatorState, Conversion};
use crate::display::{board_state, rate_cards, BoardState, RateCard};
use crate::models::CurrencyRecord;
use crate::ui::theme::Theme;

// ============================================================================
// Enum : Screen
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : tableau des cours + calculateur
    Dashboard,

    /// Saisie du montant du calculateur
    /// - le résultat est recalculé à chaque touche
    /// - Enter valide, ESC restaure la saisie précédente
    AmountInput,
}

/// Sélecteur du calculateur qui reçoit les touches ←/→
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorFocus {
    From,
    To,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Snapshot courant du dépôt des cours
    pub rates: Arc<LoadedRates>,

    /// Index de la carte sélectionnée dans le tableau
    pub selected_index: usize,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Montant et devises du calculateur
    pub calculator: CalculatorState,

    /// Sélecteur actif du calculateur
    pub focus: SelectorFocus,

    pub theme: Theme,

    /// Two-step quit
    /// - Première pression de 'q' : confirm_quit = true
    /// - Deuxième pression de 'q' : running = false
    /// - N'importe quelle autre touche : annulation
    pub confirm_quit: bool,

    /// Indicateur de chargement (sources en cours d'essai)
    pub is_loading: bool,

    pub loading_message: Option<String>,

    /// Saisie avant l'entrée en mode AmountInput, restaurée par ESC
    saved_amount: Option<String>,
}

impl App {
    /// Crée une App avec un tableau vide (avant le premier chargement)
    pub fn new() -> Self {
        Self::with_rates(Arc::new(LoadedRates::empty()))
    }

    /// Crée une App avec des cours déjà chargés
    pub fn with_rates(rates: Arc<LoadedRates>) -> Self {
        let mut calculator = CalculatorState::new();
        calculator.reconcile(&rates.list);

        Self {
            running: true,
            rates,
            selected_index: 0,
            current_screen: Screen::Dashboard,
            calculator,
            focus: SelectorFocus::From,
            theme: Theme::default(),
            confirm_quit: false,
            is_loading: false,
            loading_message: None,
            saved_amount: None,
        }
    }

    // ========================================================================
    // Cours
    // ========================================================================

    /// Installe un nouveau snapshot du dépôt
    ///
    /// CONCEPT RUST : Arc::ptr_eq
    /// - La boucle UI appelle ceci à chaque tour ; si le dépôt n'a pas changé,
    ///   c'est le même Arc et il n'y a rien à faire
    pub fn apply_rates(&mut self, rates: Arc<LoadedRates>) {
        if Arc::ptr_eq(&self.rates, &rates) {
            return;
        }

        debug!(origin = ?rates.origin, currencies = rates.list.len(), "Applying new rates snapshot");
        self.calculator.reconcile(&rates.list);
        self.rates = rates;

        let max_index = self.board_len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max_index);
    }

    pub fn board_state(&self) -> BoardState {
        board_state(&self.rates.list)
    }

    pub fn cards(&self) -> Vec<RateCard> {
        rate_cards(&self.rates.list)
    }

    /// Résultat courant du calculateur
    pub fn conversion(&self) -> Conversion {
        self.calculator.result(&self.rates.list)
    }

    fn board_len(&self) -> usize {
        self.rates.list.board_records().count()
    }

    /// Devise de la carte sélectionnée
    pub fn selected_record(&self) -> Option<&CurrencyRecord> {
        self.rates.list.board_records().nth(self.selected_index)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.board_len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    /// La carte sélectionnée devient la devise de départ du calculateur
    pub fn use_selected_as_source(&mut self) {
        if let Some(code) = self.selected_record().map(|r| r.code.clone()) {
            self.calculator.from_code = code;
        }
    }

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    // ========================================================================
    // Calculateur
    // ========================================================================

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            SelectorFocus::From => SelectorFocus::To,
            SelectorFocus::To => SelectorFocus::From,
        };
    }

    /// Fait défiler la devise du sélecteur actif
    pub fn cycle_selection(&mut self, forward: bool) {
        match self.focus {
            SelectorFocus::From => self.calculator.cycle_from(&self.rates.list, forward),
            SelectorFocus::To => self.calculator.cycle_to(&self.rates.list, forward),
        }
    }

    pub fn swap_currencies(&mut self) {
        self.calculator.swap();
    }

    /// Entre en saisie du montant
    pub fn start_amount_input(&mut self) {
        self.saved_amount = Some(self.calculator.amount_text.clone());
        self.current_screen = Screen::AmountInput;
    }

    pub fn push_amount_char(&mut self, c: char) {
        self.calculator.amount_text.push(c);
    }

    pub fn amount_backspace(&mut self) {
        self.calculator.amount_text.pop();
    }

    /// Valide la saisie en cours
    pub fn submit_amount(&mut self) {
        self.saved_amount = None;
        self.current_screen = Screen::Dashboard;
    }

    /// Annule la saisie et restaure le montant précédent
    pub fn cancel_amount_input(&mut self) {
        if let Some(previous) = self.saved_amount.take() {
            self.calculator.amount_text = previous;
        }
        self.current_screen = Screen::Dashboard;
    }

    pub fn is_in_amount_input(&self) -> bool {
        self.current_screen == Screen::AmountInput
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    // ========================================================================
    // Cycle de vie
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    /// Démarre le chargement avec un message optionnel
    pub fn start_loading(&mut self, message: Option<String>) {
        self.is_loading = true;
        self.loading_message = message;
    }

    pub fn stop_loading(&mut self) {
        self.is_loading = false;
        self.loading_message = None;
    }

    pub fn is_loading_data(&self) -> bool {
        self.is_loading
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
