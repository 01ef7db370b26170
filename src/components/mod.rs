pub mod battle_viewer;
pub mod narrative_log;
pub mod unit_panel;

// Re-export core Component trait
pub use tui_dispatch::Component;

pub use battle_viewer::{BattleViewer, BattleViewerProps};
pub use narrative_log::{NarrativeLog, NarrativeLogProps};
pub use unit_panel::{UnitPanel, UnitPanelProps};

use ratatui::style::Color;

pub const BG_PANEL: Color = Color::Rgb(26, 28, 32);
pub const TEXT_MAIN: Color = Color::Rgb(232, 232, 232);
pub const TEXT_DIM: Color = Color::Rgb(160, 160, 160);
pub const ACCENT: Color = Color::Rgb(126, 200, 180);
pub const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
pub const ACCENT_RED: Color = Color::Rgb(204, 90, 90);
pub const ACCENT_GREEN: Color = Color::Rgb(104, 204, 120);
