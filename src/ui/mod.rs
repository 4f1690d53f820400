// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod dashboard; // Tableau des cours + calculateur
pub mod events;    // Gestion des événements clavier
pub mod theme;     // Palettes clair / sombre

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler};
pub use theme::{Palette, Theme};
