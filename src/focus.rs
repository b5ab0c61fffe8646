//! The focus engine: `update_current`, the single function every action and
//! event handler calls after touching a client list, border, or selection.
//!
//! Ported from monsterwm's `update_current()` (see
//! `examples/original_source/monsterwm.c`); the steps below match its
//! branches in order.

use crate::desktop::Mode;
use crate::display::{Atom, Display, WindowId};
use crate::monitor::Monitor;

/// Colors used for the focused/unfocused window border, already resolved to
/// pixel values by `Display::allocate_color`.
#[derive(Debug, Clone, Copy)]
pub struct BorderColors {
    pub focus: u64,
    pub unfocus: u64,
}

/// Sets `monitor.current` to `win` (or clears it) and brings the display's
/// idea of focus, borders, and stacking order back in line.
///
/// `win == None` clears focus entirely (the last client on a desktop was
/// unmapped). Otherwise:
/// 1. if `win` is the previously-focused client, this is a "focus back" —
///    `win` becomes current and `prev_focus` becomes its cyclic predecessor
///    (`None` if the desktop only has one client);
/// 2. otherwise, if `win` differs from the current client, shift
///    `current` into `prev_focus` and adopt `win` as current;
/// 3. pass over every client on the desktop, giving it a border width of
///    `0` if it's the only client, fullscreen, or the mode is MONOCLE and
///    it's neither floating nor transient (`BORDER_WIDTH` otherwise), and
///    painting it focused or unfocused; non-floating/non-transient clients
///    are raised in list order as the loop goes;
/// 4. once the loop is done, the current client is raised too if it's
///    floating or transient (so it sits above the tiled stack it was
///    skipped in);
/// 5. `_NET_ACTIVE_WINDOW` is set (or cleared) to match;
/// 6. X input focus follows.
///
/// Retiling after a border-width change is the caller's job (`action::focus`
/// calls `retile` right after this).
pub fn update_current<D: Display>(
    display: &mut D,
    monitor: &mut Monitor,
    win: Option<WindowId>,
    colors: BorderColors,
    border_width: u32,
) {
    let win = match win {
        None => {
            display.set_net_active_window(None);
            monitor.current = None;
            monitor.prev_focus = None;
            return;
        }
        Some(w) => w,
    };

    if Some(win) == monitor.prev_focus {
        monitor.current = Some(win);
        monitor.prev_focus = monitor.store.prev(win);
    } else if Some(win) != monitor.current {
        monitor.prev_focus = monitor.current;
        monitor.current = Some(win);
    }

    let clients: Vec<_> = monitor.store.iter().copied().collect();
    let only_one = clients.len() <= 1;
    for c in &clients {
        let width = if only_one || c.is_fullscreen || (monitor.mode == Mode::Monocle && !c.is_floating && !c.is_transient) {
            0
        } else {
            border_width
        };
        display.set_border_width(c.win, width);
        let color = if Some(c.win) == monitor.current {
            colors.focus
        } else {
            colors.unfocus
        };
        display.set_border_color(c.win, color);
        if c.is_floating || c.is_transient {
            continue;
        }
        display.raise_window(c.win);
    }

    if let Some(cur) = monitor.current {
        if let Some(c) = monitor.store.get(cur) {
            if c.is_floating || c.is_transient {
                display.raise_window(cur);
            }
        }
    }

    display.set_input_focus(win);
    display.set_net_active_window(Some(win));
    let _ = Atom::NetActiveWindow;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::fake::FakeDisplay;
    use crate::geometry::Rect;

    fn colors() -> BorderColors {
        BorderColors { focus: 1, unfocus: 2 }
    }

    #[test]
    fn clearing_focus_drops_active_window() {
        let mut d = FakeDisplay::new();
        let mut m = Monitor::new(Rect::new(0, 0, 1600, 880), 1, Mode::Tile, 0.52, true);
        m.store.add(1, 0, true);
        m.current = Some(1);
        update_current(&mut d, &mut m, None, colors(), 2);
        assert_eq!(m.current, None);
        assert_eq!(d.active_window, None);
    }

    #[test]
    fn switching_focus_moves_current_into_prev_focus() {
        let mut d = FakeDisplay::new();
        let mut m = Monitor::new(Rect::new(0, 0, 1600, 880), 1, Mode::Tile, 0.52, true);
        m.store.add(1, 0, true);
        m.store.add(2, 0, true);
        m.current = Some(1);
        update_current(&mut d, &mut m, Some(2), colors(), 2);
        assert_eq!(m.current, Some(2));
        assert_eq!(m.prev_focus, Some(1));
        assert_eq!(d.active_window, Some(2));
        assert_eq!(d.focused, Some(2));
    }

    #[test]
    fn focusing_back_to_prev_focus_clears_it_when_alone() {
        let mut d = FakeDisplay::new();
        let mut m = Monitor::new(Rect::new(0, 0, 1600, 880), 1, Mode::Tile, 0.52, true);
        m.store.add(1, 0, true);
        m.current = Some(1);
        m.prev_focus = Some(1);
        update_current(&mut d, &mut m, Some(1), colors(), 2);
        assert_eq!(m.prev_focus, None);
    }

    #[test]
    fn floating_clients_are_raised() {
        let mut d = FakeDisplay::new();
        let mut m = Monitor::new(Rect::new(0, 0, 1600, 880), 1, Mode::Tile, 0.52, true);
        m.store.add(1, 0, true);
        m.store.get_mut(1).unwrap().is_floating = true;
        update_current(&mut d, &mut m, Some(1), colors(), 2);
        assert_eq!(d.raised, vec![1]);
    }
}
