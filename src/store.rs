// ============================================================================
// Structure : RateStore
// ============================================================================
// Propriétaire unique de la liste des cours active.
//
// CONCEPTS RUST :
// 1. Arc<LoadedRates> : une liste complète partagée sans copie
// 2. tokio::sync::watch : remplacement atomique de l'Arc + notification
//    des lecteurs ; un lecteur garde son snapshot tant qu'il le veut
// 3. Aucun &mut sur la liste : on remplace, on ne modifie jamais en place
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::api::LoadedRates;

/// Dépôt de la liste active, partagé entre le worker et l'interface
pub struct RateStore {
    sender: watch::Sender<Arc<LoadedRates>>,
}

impl RateStore {
    /// Dépôt vide (état au démarrage)
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(LoadedRates::empty()));
        Self { sender }
    }

    /// Snapshot de la liste courante
    ///
    /// Le snapshot reste cohérent même si la liste est remplacée ensuite.
    pub fn snapshot(&self) -> Arc<LoadedRates> {
        self.sender.borrow().clone()
    }

    /// Remplace la liste entière, d'un seul coup
    pub fn replace(&self, rates: LoadedRates) -> Arc<LoadedRates> {
        let rates = Arc::new(rates);
        info!(
            origin = ?rates.origin,
            currencies = rates.list.len(),
            "Replacing active currency list"
        );
        self.sender.send_replace(rates.clone());
        rates
    }

    /// Abonnement aux remplacements (pour un lecteur async)
    pub fn subscribe(&self) -> watch::Receiver<Arc<LoadedRates>> {
        self.sender.subscribe()
    }
}

impl Default for RateStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
