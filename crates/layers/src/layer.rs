use std::fmt;

/// Map layers the core toggles on a viewport.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    BuildingsFill,
    BuildingsLine,
}

impl LayerId {
    /// Both building layers, toggled together.
    pub const BUILDINGS: [LayerId; 2] = [LayerId::BuildingsFill, LayerId::BuildingsLine];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerId::BuildingsFill => "buildings-fill",
            LayerId::BuildingsLine => "buildings-line",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub opacity: f32,
    pub line_width: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, opacity: f32, line_width: f32) -> Self {
        Self {
            visible,
            opacity,
            line_width,
        }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: false,
            opacity: 1.0,
            line_width: 1.0,
        }
    }
}
