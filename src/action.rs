//! The action layer: the state-mutating functions bound to keys, buttons,
//! and the mouse-drag loop (spec.md §4.4, §4.5).
//!
//! Every action ends by calling `focus()` and/or `retile()` so the display
//! matches the model — the same closing move the original makes at the end
//! of nearly every handler in `examples/original_source/monsterwm.c`.

use std::process::{Command, Stdio};

use crate::client::Client;
use crate::desktop::Mode;
use crate::display::{Display, WindowId};
use crate::focus::update_current;
use crate::layout::tile;
use crate::wm::Wm;

/// Recomputes geometry for the current monitor's current desktop and pushes
/// it to the display. The equivalent of calling `tile()` in the original.
pub fn retile<D: Display>(wm: &Wm, display: &mut D) {
    let border_width = wm.border_width();
    let mon = wm.current();
    for (win, rect) in tile(mon, border_width, wm.config.panel_height as i32, wm.config.top_panel) {
        display.move_resize(win, rect.x, rect.y, rect.w, rect.h);
    }
}

/// Refocuses `win` on the current monitor and retiles.
pub fn focus<D: Display>(wm: &mut Wm, display: &mut D, win: Option<WindowId>) {
    let colors = wm.colors;
    let border_width = wm.border_width();
    update_current(display, wm.current_mut(), win, colors, border_width);
    retile(wm, display);
}

/// `spawn(cmd)`: runs a detached child in its own session so it survives
/// the window manager exiting; stdout/stderr are not inherited, matching
/// the original's fire-and-forget semantics.
pub fn spawn(cmd: &[String]) {
    if cmd.is_empty() {
        return;
    }
    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).stdout(Stdio::null()).stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            command.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }
    if let Err(e) = command.spawn() {
        error!("failed to spawn {:?}: {}", cmd, e);
    }
}

/// `killclient`: WM_DELETE_WINDOW if advertised, else a forceful
/// `kill_client`, then remove the client from the store and refocus
/// `prev_focus`. `current` is cleared before that refocus — otherwise it
/// would still point at the window just removed and `update_current` would
/// derive the wrong `prev_focus` from it.
pub fn killclient<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if !display.send_delete(win) {
        display.kill_client(win);
    }
    wm.current_mut().store.remove(win);
    wm.current_mut().current = None;
    let prev = wm.current().prev_focus;
    focus(wm, display, prev);
}

/// `next_win` / `prev_win`: cycle focus, wrapping at the ends.
pub fn next_win<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if let Some(next) = wm.current().store.next_of(win) {
        focus(wm, display, Some(next));
    }
}

pub fn prev_win<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if let Some(prev) = wm.current().store.prev(win) {
        focus(wm, display, Some(prev));
    }
}

/// `move_up` / `move_down`: swap current with its list-order neighbor.
pub fn move_up<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if let Some(prev) = wm.current().store.prev(win) {
        wm.current_mut().store.swap(win, prev);
        retile(wm, display);
    }
}

pub fn move_down<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if let Some(next) = wm.current().store.next_of(win) {
        wm.current_mut().store.swap(win, next);
        retile(wm, display);
    }
}

/// `swap_master`: if current is head, `move_down` once; otherwise
/// `move_up` repeatedly until it is; then focus the head.
pub fn swap_master<D: Display>(wm: &mut Wm, display: &mut D) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    if wm.current().store.head().map(|c| c.win) == Some(win) {
        move_down(wm, display);
        return;
    }
    loop {
        let head = wm.current().store.head().map(|c| c.win);
        if head == Some(win) {
            break;
        }
        let prev = match wm.current().store.prev(win) {
            Some(p) => p,
            None => break,
        };
        wm.current_mut().store.swap(win, prev);
    }
    let head = wm.current().store.head().map(|c| c.win);
    focus(wm, display, head);
}

/// `switch_mode(m)`: toggling back into the already-active mode clears
/// every client's floating flag (a quick way back to a clean tile); either
/// way the master size is recomputed for the new mode's split axis.
pub fn switch_mode<D: Display>(wm: &mut Wm, display: &mut D, mode: Mode) {
    let master_fraction = wm.config.master_size;
    let mon = wm.current_mut();
    if mon.mode == mode {
        for c in mon.store.iter_mut() {
            c.is_floating = false;
        }
    }
    mon.mode = mode;
    mon.reset_master_size(master_fraction);
    focus(wm, display, wm.current().current);
}

/// `resize_master(delta)`: rejects the change if either side of the split
/// would shrink below `min_window_size`.
pub fn resize_master<D: Display>(wm: &mut Wm, display: &mut D, delta: i32) {
    let min = wm.config.min_window_size as i32;
    let mon = wm.current_mut();
    let axis = if mon.mode == Mode::Bstack {
        mon.work_area.h as i32
    } else {
        mon.work_area.w as i32
    };
    let new_size = mon.master_size + delta;
    if new_size <= min || axis - new_size <= min {
        return;
    }
    mon.master_size = new_size;
    retile(wm, display);
}

/// `resize_stack(delta)`: adjusts growth, the pixel imbalance awarded to
/// the first stack client.
pub fn resize_stack<D: Display>(wm: &mut Wm, display: &mut D, delta: i32) {
    wm.current_mut().growth += delta;
    retile(wm, display);
}

/// `change_desktop(i)`: map the target desktop's clients before unmapping
/// the outgoing desktop's, current-first/current-last respectively, to
/// minimize flicker (spec.md §9 Open Question (a) — the exact ordering is
/// a quality property, not a correctness one; this is the original's
/// ordering).
pub fn change_desktop<D: Display>(wm: &mut Wm, display: &mut D, i: usize) {
    let mon = wm.current();
    if i == mon.current_desktop || i >= mon.desktops.len() {
        return;
    }
    let previous = mon.current_desktop;

    wm.current_mut().select_desktop(i);
    let current_win = wm.current().current;
    let mut wins: Vec<WindowId> = wm.current().store.iter().map(|c| c.win).collect();
    wins.sort_by_key(|w| if Some(*w) == current_win { 0 } else { 1 });
    for w in wins {
        display.map_window(w);
    }
    focus(wm, display, current_win);

    wm.current_mut().select_desktop(previous);
    let current_win = wm.current().current;
    let mut wins: Vec<WindowId> = wm.current().store.iter().map(|c| c.win).collect();
    wins.sort_by_key(|w| if Some(*w) == current_win { 1 } else { 0 });
    for w in wins {
        display.unmap_window(w);
    }

    wm.current_mut().select_desktop(i);
    wm.current_mut().previous_desktop = previous;
}

pub fn last_desktop<D: Display>(wm: &mut Wm, display: &mut D) {
    let target = wm.current().previous_desktop;
    change_desktop(wm, display, target);
}

/// `rotate(delta)`: `change_desktop` by `delta` steps, wrapping.
pub fn rotate<D: Display>(wm: &mut Wm, display: &mut D, delta: i32) {
    let n = wm.current().desktops.len() as i32;
    if n == 0 {
        return;
    }
    let target = (wm.current().current_desktop as i32 + delta).rem_euclid(n) as usize;
    change_desktop(wm, display, target);
}

/// `rotate_filled(delta)`: like `rotate`, but skips desktops whose client
/// list is empty, so cycling never lands on a blank desktop while any
/// other desktop on this monitor has clients.
pub fn rotate_filled<D: Display>(wm: &mut Wm, display: &mut D, delta: i32) {
    let n = wm.current().desktops.len() as i32;
    if n == 0 {
        return;
    }
    let start = wm.current().current_desktop as i32;
    let mut i = start;
    for _ in 0..n {
        i = (i + delta).rem_euclid(n);
        let idx = i as usize;
        let non_empty = if idx == wm.current().current_desktop {
            !wm.current().store.is_empty()
        } else {
            !wm.current().desktops[idx].store.is_empty()
        };
        if non_empty {
            change_desktop(wm, display, idx);
            return;
        }
    }
}

/// `change_monitor(i)`: moves the "current" pointer across monitors and
/// refocuses. Unlike desktops, monitors don't need map/unmap bookkeeping —
/// every monitor's clients stay mapped on their own screen.
pub fn change_monitor<D: Display>(wm: &mut Wm, display: &mut D, i: usize) {
    if i >= wm.monitors.len() || i == wm.current_monitor {
        return;
    }
    wm.previous_monitor = wm.current_monitor;
    wm.current_monitor = i;
    let win = wm.current().current;
    focus(wm, display, win);
}

pub fn last_monitor<D: Display>(wm: &mut Wm, display: &mut D) {
    let target = wm.previous_monitor;
    change_monitor(wm, display, target);
}

pub fn rotate_monitor<D: Display>(wm: &mut Wm, display: &mut D, delta: i32) {
    let n = wm.monitors.len() as i32;
    if n == 0 {
        return;
    }
    let target = (wm.current_monitor as i32 + delta).rem_euclid(n) as usize;
    change_monitor(wm, display, target);
}

/// `client_to_desktop(i)`: detach current from this desktop, append to the
/// tail of desktop `i`, focus it there, then come back and focus whatever
/// was focused before (per spec.md §4.4); if `follow_window` is set, also
/// switch to the destination desktop.
pub fn client_to_desktop<D: Display>(wm: &mut Wm, display: &mut D, i: usize) {
    let mon = wm.current();
    if i == mon.current_desktop || i >= mon.desktops.len() {
        return;
    }
    let win = match mon.current {
        Some(w) => w,
        None => return,
    };

    let client = match wm.current_mut().store.remove(win) {
        Some(c) => c,
        None => return,
    };
    display.unmap_window(win);
    let prev_focus = wm.current().prev_focus;
    focus(wm, display, prev_focus);

    let previous = wm.current().current_desktop;
    wm.current_mut().select_desktop(i);
    wm.current_mut().store.push_back(client);
    focus(wm, display, Some(win));
    wm.current_mut().select_desktop(previous);

    if wm.config.follow_window {
        change_desktop(wm, display, i);
    }
}

/// `client_to_monitor(i)`: moves current to monitor `i`, preserving its
/// flags, and retiles both the source and destination monitors.
pub fn client_to_monitor<D: Display>(wm: &mut Wm, display: &mut D, i: usize) {
    if i >= wm.monitors.len() || i == wm.current_monitor {
        return;
    }
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    let client = match wm.current_mut().store.remove(win) {
        Some(c) => c,
        None => return,
    };
    display.unmap_window(win);

    // Mirrors the original's removeclient(): current must be cleared before
    // refocusing the source monitor, otherwise prev_focus would be derived
    // from the window we just detached.
    wm.current_mut().current = None;
    let prev_focus = wm.current().prev_focus;
    focus(wm, display, prev_focus);

    let source_monitor = wm.current_monitor;
    wm.current_monitor = i;
    let mut moved = Client::new(win, i);
    moved.is_urgent = client.is_urgent;
    moved.is_transient = client.is_transient;
    moved.is_fullscreen = client.is_fullscreen;
    moved.is_floating = client.is_floating;
    wm.current_mut().store.push_back(moved);
    retile(wm, display);
    display.map_window(win);
    focus(wm, display, Some(win));

    if wm.config.follow_window {
        change_monitor(wm, display, i);
    } else {
        wm.current_monitor = source_monitor;
    }
}

/// `togglepanel`: flips `show_panel` on the current desktop and retiles.
pub fn togglepanel<D: Display>(wm: &mut Wm, display: &mut D) {
    wm.current_mut().show_panel = !wm.current().show_panel;
    retile(wm, display);
}

/// `focusurgent`: focuses the first urgent client found, searching every
/// monitor's current desktop (the original also only scans mapped
/// desktops, which in this model is exactly the live `store` of each
/// monitor).
pub fn focusurgent<D: Display>(wm: &mut Wm, display: &mut D) {
    for idx in 0..wm.monitors.len() {
        if let Some(win) = wm.monitors[idx].store.iter().find(|c| c.is_urgent).map(|c| c.win) {
            if idx != wm.current_monitor {
                wm.previous_monitor = wm.current_monitor;
                wm.current_monitor = idx;
            }
            focus(wm, display, Some(win));
            return;
        }
    }
}

/// `quit(code)`: stop the event loop; `cleanup()` (called by `run()`
/// after the loop exits) tears down clients and the connection.
pub fn quit(wm: &mut Wm, code: i32) {
    wm.running = false;
    wm.exit_code = code;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::display::fake::FakeDisplay;
    use crate::focus::BorderColors;
    use crate::geometry::Rect;

    fn wm_with(n: usize) -> Wm {
        let config = Config::default();
        let mut wm = Wm::new(
            vec![Rect::new(0, 0, 1598, 878)],
            config,
            BorderColors { focus: 1, unfocus: 2 },
            0x10,
        );
        for i in 0..n {
            wm.current_mut().store.add(i as u64 + 1, 0, true);
        }
        wm.current_mut().current = wm.current().store.head().map(|c| c.win);
        wm
    }

    #[test]
    fn next_win_wraps_around() {
        let mut wm = wm_with(3);
        let mut d = FakeDisplay::new();
        wm.current_mut().current = Some(1);
        next_win(&mut wm, &mut d);
        assert_eq!(wm.current().current, Some(2));
        next_win(&mut wm, &mut d);
        assert_eq!(wm.current().current, Some(3));
        next_win(&mut wm, &mut d);
        assert_eq!(wm.current().current, Some(1));
    }

    #[test]
    fn move_up_is_the_inverse_of_move_down() {
        let mut wm = wm_with(3);
        let mut d = FakeDisplay::new();
        wm.current_mut().current = Some(2);
        let before: Vec<_> = wm.current().store.iter().map(|c| c.win).collect();
        move_up(&mut wm, &mut d);
        move_down(&mut wm, &mut d);
        let after: Vec<_> = wm.current().store.iter().map(|c| c.win).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn swap_master_brings_current_to_head() {
        let mut wm = wm_with(3);
        let mut d = FakeDisplay::new();
        wm.current_mut().current = Some(3);
        swap_master(&mut wm, &mut d);
        assert_eq!(wm.current().store.head().map(|c| c.win), Some(3));
        assert_eq!(wm.current().current, Some(3));
    }

    #[test]
    fn resize_master_rejects_shrinking_below_minimum() {
        let mut wm = wm_with(2);
        let mut d = FakeDisplay::new();
        let original = wm.current().master_size;
        resize_master(&mut wm, &mut d, -100_000);
        assert_eq!(wm.current().master_size, original);
    }

    #[test]
    fn rotate_wraps_across_all_desktops() {
        let mut wm = wm_with(0);
        let mut d = FakeDisplay::new();
        let n = wm.current().desktops.len();
        for _ in 0..n {
            rotate(&mut wm, &mut d, 1);
        }
        assert_eq!(wm.current().current_desktop, 0);
    }

    #[test]
    fn switch_mode_to_same_mode_clears_floating() {
        let mut wm = wm_with(1);
        let mut d = FakeDisplay::new();
        wm.current_mut().store.get_mut(1).unwrap().is_floating = true;
        switch_mode(&mut wm, &mut d, Mode::Tile);
        assert!(!wm.current().store.get(1).unwrap().is_floating);
    }

    #[test]
    fn client_to_desktop_moves_window_and_tracks_previous() {
        let mut wm = wm_with(2);
        let mut d = FakeDisplay::new();
        wm.current_mut().current = Some(1);
        client_to_desktop(&mut wm, &mut d, 2);
        assert!(wm.current().store.get(1).is_none());
        wm.current_mut().select_desktop(2);
        assert!(wm.current().store.get(1).is_some());
    }
}
