//! Color theme definitions (Nord palette).

use ratatui::style::Color;

/// Polar night 4, used for separators and muted chrome.
pub const NORD_POLAR_NIGHT_4: Color = Color::Rgb(76, 86, 106);
/// Frost blue.
pub const ACCENT_PRIMARY: Color = Color::Rgb(136, 192, 208);
/// Frost cyan.
pub const ACCENT_SECONDARY: Color = Color::Rgb(143, 188, 187);

pub const SUCCESS: Color = Color::Rgb(163, 190, 140);
pub const WARNING: Color = Color::Rgb(235, 203, 139);
pub const ERROR: Color = Color::Rgb(191, 97, 106);

pub const TEXT_PRIMARY: Color = Color::Rgb(236, 239, 244);
pub const TEXT_SECONDARY: Color = Color::Rgb(143, 150, 168);
pub const INACTIVE: Color = Color::Rgb(110, 118, 135);

pub const BORDER_DEFAULT: Color = NORD_POLAR_NIGHT_4;
pub const BORDER_FOCUSED: Color = ACCENT_PRIMARY;

pub const ROW_SELECTED_BG: Color = Color::Rgb(59, 66, 82);
pub const ROW_SELECTED_FG: Color = TEXT_PRIMARY;
