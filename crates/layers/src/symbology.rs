//! Colours, glyphs and badge rules shared by every marker and overlay.

use crate::layer::{LayerId, LayerStyle};

/// Building colours, indexed by building order and wrapping around.
pub const BUILDING_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9",
];

pub const BUILDINGS_FILL_STYLE: LayerStyle = LayerStyle::new(false, 0.3, 0.0);
pub const BUILDINGS_LINE_STYLE: LayerStyle = LayerStyle::new(false, 1.0, 2.0);

pub fn building_color(index: usize) -> &'static str {
    BUILDING_PALETTE[index % BUILDING_PALETTE.len()]
}

pub fn layer_style(layer: LayerId) -> LayerStyle {
    match layer {
        LayerId::BuildingsFill => BUILDINGS_FILL_STYLE,
        LayerId::BuildingsLine => BUILDINGS_LINE_STYLE,
    }
}

/// Icon URL that means "no custom icon".
pub const DEFAULT_ICON_URL: &str = "icons/default.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    Icon(String),
    Initial(char),
}

impl Glyph {
    /// Custom icon when one is set, otherwise the first character of the
    /// username (`?` without one).
    pub fn resolve(icon_url: Option<&str>, username: Option<&str>) -> Self {
        match icon_url {
            Some(url) if !url.is_empty() && url != DEFAULT_ICON_URL => Glyph::Icon(url.to_string()),
            _ => Glyph::Initial(initial(username)),
        }
    }
}

pub fn initial(username: Option<&str>) -> char {
    username.and_then(|name| name.chars().next()).unwrap_or('?')
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinStyle {
    pub fill: &'static str,
    pub border: &'static str,
}

pub const GPS_PIN: PinStyle = PinStyle {
    fill: "#FF0000",
    border: "#CC0000",
};

pub const REGISTERED_PIN: PinStyle = PinStyle {
    fill: "#0066FF",
    border: "#004499",
};

pub const CLUSTER_PIN: PinStyle = PinStyle {
    fill: "#FFD700",
    border: "#9ACD32",
};

pub const BADGE_MAX_COUNT: usize = 99;
pub const BADGE_FONT_PX: u32 = 16;
pub const BADGE_FONT_PX_OVERFLOW: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterBadge {
    pub text: String,
    pub font_px: u32,
}

impl ClusterBadge {
    pub fn for_count(count: usize) -> Self {
        if count > BADGE_MAX_COUNT {
            Self {
                text: format!("{BADGE_MAX_COUNT}+"),
                font_px: BADGE_FONT_PX_OVERFLOW,
            }
        } else {
            Self {
                text: count.to_string(),
                font_px: BADGE_FONT_PX,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClusterBadge, Glyph, building_color, initial};

    #[test]
    fn palette_wraps() {
        assert_eq!(building_color(0), "#FF6B6B");
        assert_eq!(building_color(9), "#85C1E9");
        assert_eq!(building_color(10), building_color(0));
    }

    #[test]
    fn glyph_prefers_custom_icon() {
        assert_eq!(
            Glyph::resolve(Some("icons/cat.png"), Some("Mio")),
            Glyph::Icon("icons/cat.png".to_string())
        );
        assert_eq!(
            Glyph::resolve(Some("icons/default.png"), Some("Mio")),
            Glyph::Initial('M')
        );
        assert_eq!(Glyph::resolve(None, Some("七海")), Glyph::Initial('七'));
        assert_eq!(initial(None), '?');
        assert_eq!(initial(Some("")), '?');
    }

    #[test]
    fn badge_caps_at_99() {
        assert_eq!(ClusterBadge::for_count(7).text, "7");
        assert_eq!(ClusterBadge::for_count(99).font_px, 16);
        let big = ClusterBadge::for_count(100);
        assert_eq!(big.text, "99+");
        assert_eq!(big.font_px, 12);
    }
}
