//! Color constants for the terminal user interface.

use ratatui::style::Color;

// Semantic names instead of raw colors at each call site,
// so the whole interface can be re-tinted in one place.

/// Border and label of the control holding keyboard focus.
pub const FOCUS: Color = Color::Yellow;
/// Active step tab and section headings.
pub const ACCENT: Color = Color::Cyan;
/// Muted chrome: inactive tabs, unfocused borders, key hints.
pub const DIM: Color = Color::DarkGray;
/// Eager-save button while actionable.
pub const SAVE_IDLE: Color = Color::Blue;
/// Eager-save button while a save is in flight.
pub const SAVE_BUSY: Color = Color::Yellow;
/// Eager-save button after a successful save.
pub const SAVE_OK: Color = Color::Green;
/// Failed saves and inline error lines.
pub const ERROR: Color = Color::Red;
/// Status bar background.
pub const STATUS_BG: Color = Color::DarkGray;
/// Status bar text.
pub const STATUS_FG: Color = Color::White;
/// Background of the highlighted list row.
pub const SELECT_BG: Color = Color::Gray;
/// Foreground of the highlighted list row.
pub const SELECT_FG: Color = Color::Black;
/// Code block background in the description editor.
pub const CODE_BG: Color = Color::Rgb(30, 30, 40);
