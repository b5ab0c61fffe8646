//! Per-desktop saved state and the tiling layout mode.

use crate::client::ClientStore;
use crate::display::WindowId;

/// Tiling layout mode. The discriminant order is load-bearing: it is exactly
/// the `<mode>` field of the `desktopinfo` stdout protocol (spec.md §6),
/// 0..3 for {TILE, MONOCLE, BSTACK, GRID}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tile = 0,
    Monocle = 1,
    Bstack = 2,
    Grid = 3,
}

impl Mode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Saved state of one virtual desktop on one monitor (spec.md §3).
#[derive(Debug, Clone)]
pub struct Desktop {
    pub mode: Mode,
    pub master_size: i32,
    pub growth: i32,
    pub show_panel: bool,
    pub store: ClientStore,
    pub current: Option<WindowId>,
    pub prev_focus: Option<WindowId>,
}

impl Desktop {
    pub fn new(mode: Mode, master_size: i32, show_panel: bool) -> Self {
        Desktop {
            mode,
            master_size,
            growth: 0,
            show_panel,
            store: ClientStore::new(),
            current: None,
            prev_focus: None,
        }
    }
}
