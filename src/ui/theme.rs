// ============================================================================
// Thème clair / sombre
// ============================================================================
// CONCEPT RUST : Enum Copy + méthode qui retourne une palette
// - Le thème est une simple valeur, basculée avec la touche 't'
// - Le rendu ne connaît que la Palette, jamais les couleurs en dur
// ============================================================================

use ratatui::style::Color;

/// Thème de l'interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Couleurs utilisées par le rendu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub buy: Color,
    pub sell: Color,
    pub warning: Color,
    pub error: Color,
    pub selection: Color,
}

impl Theme {
    /// Thème opposé
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Dark => "тёмная тема",
            Theme::Light => "светлая тема",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::Reset,
                text: Color::White,
                muted: Color::Gray,
                border: Color::Cyan,
                accent: Color::Yellow,
                buy: Color::Green,
                sell: Color::LightRed,
                warning: Color::Yellow,
                error: Color::Red,
                selection: Color::DarkGray,
            },
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                muted: Color::DarkGray,
                border: Color::Blue,
                accent: Color::Magenta,
                buy: Color::Rgb(0, 120, 0),
                sell: Color::Rgb(170, 0, 0),
                warning: Color::Rgb(160, 90, 0),
                error: Color::Red,
                selection: Color::Rgb(210, 210, 230),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        assert_eq!(Theme::default(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(Theme::Dark.palette(), Theme::Light.palette());
        assert_eq!(Theme::Light.palette().text, Color::Black);
    }
}
