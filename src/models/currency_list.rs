// ============================================================================
// Structure : CurrencyList
// ============================================================================
// Liste validée des devises actives : un code unique par enregistrement,
// rouble toujours présent pour le calculateur.
//
// CONCEPTS RUST :
// 1. Newtype : Vec<CurrencyRecord> encapsulé, les invariants sont vérifiés
//    à la construction et ne peuvent plus être cassés ensuite
// 2. Pas de &mut : une liste n'est jamais modifiée, elle est remplacée
// ============================================================================

use std::collections::HashSet;

use thiserror::Error;

use super::currency::{CurrencyRecord, RUB_CODE};

/// Raisons de rejet d'une liste venant d'une source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListError {
    #[error("liste de devises vide")]
    Empty,

    #[error("code de devise en double : {0}")]
    DuplicateCode(String),

    #[error("code de devise vide")]
    BlankCode,
}

/// Liste immuable des devises
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyList {
    records: Vec<CurrencyRecord>,
}

impl CurrencyList {
    /// Liste vide : état au démarrage, avant tout chargement
    pub fn empty() -> Self {
        Self::default()
    }

    /// Valide une liste venant d'une source
    ///
    /// - refuse une liste vide, un code vide ou un code en double
    /// - ajoute l'unité RUB en fin de liste si la source l'a omise
    pub fn new(records: Vec<CurrencyRecord>) -> Result<Self, ListError> {
        if records.is_empty() {
            return Err(ListError::Empty);
        }

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.code.trim().is_empty() {
                return Err(ListError::BlankCode);
            }
            if !seen.insert(record.code.as_str()) {
                return Err(ListError::DuplicateCode(record.code.clone()));
            }
        }

        Ok(Self::with_rub(records))
    }

    /// Construit depuis une table connue valide (table codée en dur)
    pub(crate) fn from_static(records: Vec<CurrencyRecord>) -> Self {
        debug_assert!(Self::new(records.clone()).is_ok());
        Self::with_rub(records)
    }

    fn with_rub(mut records: Vec<CurrencyRecord>) -> Self {
        if !records.iter().any(CurrencyRecord::is_rub) {
            records.push(CurrencyRecord::rub_unit());
        }
        Self { records }
    }

    /// Cherche une devise par code
    ///
    /// CONCEPT RUST : Option<&T>
    /// - Retourne une référence dans la liste (pas de copie)
    pub fn find(&self, code: &str) -> Option<&CurrencyRecord> {
        self.records.iter().find(|record| record.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CurrencyRecord> {
        self.records.iter()
    }

    /// Devises du tableau des cours (tout sauf le rouble)
    pub fn board_records(&self) -> impl Iterator<Item = &CurrencyRecord> {
        self.records.iter().filter(|record| !record.is_rub())
    }

    /// Codes disponibles dans le calculateur, dans l'ordre de la liste
    pub fn codes(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a CurrencyList {
    type Item = &'a CurrencyRecord;
    type IntoIter = std::slice::Iter<'a, CurrencyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Vérifie si un code désigne le rouble
pub fn is_rub_code(code: &str) -> bool {
    code == RUB_CODE
}

// ============================================================================
// Tests
// ============================================================================
