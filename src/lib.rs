// ============================================================================
// Kursboard - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;        // Sources de cours et chaîne de repli
pub mod app;        // État de l'application
pub mod calculator; // Conversion entre devises
pub mod config;     // Paramètres des sources
pub mod display;    // Politique d'affichage du tableau
pub mod models;     // Structures de données
pub mod store;      // Dépôt de la liste active
pub mod ui;         // Interface utilisateur
