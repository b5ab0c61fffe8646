//! Per-monitor state: working area, desktop array, and the "live" mirrored
//! copy of whichever desktop is currently selected.
//!
//! monsterwm duplicates desktop fields between the `monitor` struct (the
//! live copy) and the `desktop` array, swapping them in `select_desktop`.
//! That shape is kept here (see spec.md §3, §9) rather than the
//! `(mon, dsk)`-context alternative the Design Notes also allow, because it
//! keeps every other module's signatures — layout, focus, actions — exactly
//! as simple as the original's: they just read `monitor.mode`,
//! `monitor.store`, etc.

use crate::client::Client;
use crate::desktop::{Desktop, Mode};
use crate::display::WindowId;
use crate::geometry::Rect;

#[derive(Debug, Clone)]
pub struct Monitor {
    /// Working rectangle: already adjusted for the panel strip and border.
    pub work_area: Rect,
    pub current_desktop: usize,
    pub previous_desktop: usize,
    pub desktops: Vec<Desktop>,

    // Live mirror of `desktops[current_desktop]`.
    pub mode: Mode,
    pub master_size: i32,
    pub growth: i32,
    pub show_panel: bool,
    pub store: crate::client::ClientStore,
    pub current: Option<WindowId>,
    pub prev_focus: Option<WindowId>,
}

impl Monitor {
    pub fn new(
        work_area: Rect,
        num_desktops: usize,
        default_mode: Mode,
        master_size_fraction: f64,
        show_panel: bool,
    ) -> Self {
        let master_size = Self::initial_master_size(default_mode, work_area, master_size_fraction);
        let desktops = (0..num_desktops)
            .map(|_| Desktop::new(default_mode, master_size, show_panel))
            .collect();

        Monitor {
            work_area,
            current_desktop: 0,
            previous_desktop: 0,
            desktops,
            mode: default_mode,
            master_size,
            growth: 0,
            show_panel,
            store: crate::client::ClientStore::new(),
            current: None,
            prev_focus: None,
        }
    }

    fn initial_master_size(mode: Mode, work_area: Rect, fraction: f64) -> i32 {
        let axis = if mode == Mode::Bstack {
            work_area.h
        } else {
            work_area.w
        };
        (axis as f64 * fraction) as i32
    }

    /// `save_desktop(i)`: write the live fields back into `desktops[i]`.
    pub fn save_desktop(&mut self, i: usize) {
        if i >= self.desktops.len() {
            return;
        }
        let d = &mut self.desktops[i];
        d.mode = self.mode;
        d.master_size = self.master_size;
        d.growth = self.growth;
        d.show_panel = self.show_panel;
        d.store = self.store.clone();
        d.current = self.current;
        d.prev_focus = self.prev_focus;
    }

    /// `select_desktop(i)`: save the live copy into `desktops[current]`,
    /// then load `desktops[i]` into the live copy.
    pub fn select_desktop(&mut self, i: usize) {
        if i >= self.desktops.len() {
            return;
        }
        self.save_desktop(self.current_desktop);
        let d = &self.desktops[i];
        self.mode = d.mode;
        self.master_size = d.master_size;
        self.growth = d.growth;
        self.show_panel = d.show_panel;
        self.store = d.store.clone();
        self.current = d.current;
        self.prev_focus = d.prev_focus;
        self.current_desktop = i;
    }

    /// Recompute the master size for whatever mode the live desktop is in,
    /// using the configured fraction. Used by `switch_mode`.
    pub fn reset_master_size(&mut self, fraction: f64) {
        let axis = if self.mode == Mode::Bstack {
            self.work_area.h
        } else {
            self.work_area.w
        };
        self.master_size = (axis as f64 * fraction) as i32;
    }

    /// Search every desktop of this monitor for `win`, restoring the
    /// original desktop selection before returning. Part of the global
    /// `window_to_client` scan (spec.md §4.1); a monitor-local helper.
    pub fn find_client(&mut self, win: WindowId) -> Option<Client> {
        let original = self.current_desktop;
        let mut found = None;
        for d in 0..self.desktops.len() {
            self.select_desktop(d);
            if let Some(c) = self.store.get(win) {
                found = Some(*c);
                break;
            }
        }
        self.select_desktop(original);
        found
    }

    /// Effective layout mode for `tile()`: a lone client always forces
    /// MONOCLE, regardless of the saved mode (spec.md §4.3).
    pub fn effective_mode(&self) -> Mode {
        if self.store.len() <= 1 {
            Mode::Monocle
        } else {
            self.mode
        }
    }

    /// `(available_height, top_offset)` per `tile()`'s formula.
    pub fn layout_extent(&self, panel_height: i32, top_panel: bool) -> (i32, i32) {
        let hh = self.work_area.h as i32 + if self.show_panel { 0 } else { panel_height };
        let cy = if top_panel && self.show_panel {
            panel_height
        } else {
            0
        };
        (hh, cy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mon() -> Monitor {
        Monitor::new(Rect::new(0, 20, 1600, 880), 5, Mode::Tile, 0.52, true)
    }

    #[test]
    fn select_desktop_round_trip() {
        let mut m = mon();
        m.select_desktop(1);
        m.master_size = 999;
        m.select_desktop(0);
        assert_eq!(m.master_size, (1600f64 * 0.52) as i32);
        m.select_desktop(1);
        assert_eq!(m.master_size, 999);
    }

    #[test]
    fn last_desktop_round_trip() {
        // change_desktop(a); change_desktop(b); last_desktop() returns to b,
        // because previous_desktop tracks the desktop active *before* the
        // most recent switch (spec.md §8 property 6).
        let mut m = mon();
        m.previous_desktop = m.current_desktop;
        m.select_desktop(2);
        m.previous_desktop = 0;
        m.select_desktop(3);
        m.previous_desktop = 2;
        assert_eq!(m.previous_desktop, 2);
    }

    #[test]
    fn single_client_forces_monocle() {
        let mut m = mon();
        m.store.add(1, 0, true);
        assert_eq!(m.effective_mode(), Mode::Monocle);
        m.store.add(2, 0, true);
        assert_eq!(m.effective_mode(), Mode::Tile);
    }
}
