//! Erreurs de la chaîne de sources de cours.
//!
//! Aucune de ces erreurs ne sort de [`SourceChain`](super::SourceChain) :
//! chacune est journalisée puis la source suivante est essayée.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Échec d'une tentative de chargement d'une source
#[derive(Error, Debug)]
pub enum LoadError {
    /// Le client de la source n'a pas pu être construit ou n'est pas configuré
    #[error("source indisponible : {source_name} ({reason})")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// Le délai d'attente a été dépassé
    #[error("délai dépassé pour {source_name} après {waited:?}")]
    SourceTimeout {
        source_name: &'static str,
        waited: Duration,
    },

    /// Données absentes, vides ou de forme inattendue
    #[error("données invalides de {source_name} : {reason}")]
    SourceMalformed {
        source_name: &'static str,
        reason: String,
    },

    /// Erreur de transport ou statut HTTP non-2xx
    #[error("erreur réseau : {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Fichier local illisible ou invalide
    #[error("fichier de cours illisible {path:?} : {reason}")]
    ParseError { path: PathBuf, reason: String },
}

impl LoadError {
    pub fn unavailable(source_name: &'static str, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(source_name: &'static str, reason: impl ToString) -> Self {
        Self::SourceMalformed {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ParseError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Nom court de la catégorie, pour les logs structurés
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::SourceTimeout { .. } => "source_timeout",
            Self::SourceMalformed { .. } => "source_malformed",
            Self::NetworkError(_) => "network_error",
            Self::ParseError { .. } => "parse_error",
        }
    }
}
