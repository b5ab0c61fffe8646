//! The event dispatcher and its ten handler contracts (spec.md §4.6-§4.8).
//!
//! Ported from the `switch` in `examples/original_source/monsterwm.c`'s
//! `events[]` table, opcode-indexed there and variant-matched here.

use crate::action;
use crate::config::Action;
use crate::display::{Atom, Display, Event, FullscreenRequest, WindowId};
use crate::wm::Wm;

/// Runs one event to completion. Called from the top-level loop in
/// `main.rs` and, re-entrantly, from the interactive move/resize loop
/// below — matching the original's note that `ConfigureRequest`/
/// `MapRequest` must stay handleable mid-drag so new windows don't
/// deadlock the manager.
pub fn dispatch<D: Display>(wm: &mut Wm, display: &mut D, event: Event) {
    trace!("{:?}", event);
    match event {
        Event::KeyPress { keycode, state } => handle_keypress(wm, display, keycode, state),
        Event::ButtonPress {
            button,
            state,
            window,
            root_x,
            root_y,
        } => handle_buttonpress(wm, display, button, state, window, root_x, root_y),
        Event::MapRequest { window } => handle_map_request(wm, display, window, false),
        Event::ConfigureRequest {
            window,
            x,
            y,
            width,
            height,
            border_width,
            value_mask,
        } => handle_configure_request(wm, display, window, x, y, width, height, border_width, value_mask),
        Event::DestroyNotify { window } => handle_remove(wm, display, window),
        Event::UnmapNotify { window, send_event } => {
            if !send_event {
                handle_remove(wm, display, window);
            }
        }
        Event::EnterNotify { window, .. } => handle_enternotify(wm, display, window),
        Event::MotionNotify { root_x, root_y } => handle_motionnotify(wm, display, root_x, root_y),
        Event::PropertyNotify { window, atom } => handle_propertynotify(wm, display, window, atom),
        Event::ClientMessage { window, fullscreen } => handle_clientmessage(wm, display, window, fullscreen),
    }
}

fn run_action<D: Display>(wm: &mut Wm, display: &mut D, act: &Action) {
    match act.clone() {
        Action::Spawn(cmd) => action::spawn(&cmd),
        Action::KillClient => action::killclient(wm, display),
        Action::NextWindow => action::next_win(wm, display),
        Action::PrevWindow => action::prev_win(wm, display),
        Action::MoveUp => action::move_up(wm, display),
        Action::MoveDown => action::move_down(wm, display),
        Action::SwapMaster => action::swap_master(wm, display),
        Action::SwitchMode(m) => action::switch_mode(wm, display, m),
        Action::ResizeMaster(d) => action::resize_master(wm, display, d),
        Action::ResizeStack(d) => action::resize_stack(wm, display, d),
        Action::Rotate(d) => action::rotate(wm, display, d),
        Action::RotateFilled(d) => action::rotate_filled(wm, display, d),
        Action::RotateMonitor(d) => action::rotate_monitor(wm, display, d),
        Action::ChangeDesktop(i) => action::change_desktop(wm, display, i),
        Action::ChangeMonitor(i) => action::change_monitor(wm, display, i),
        Action::LastDesktop => action::last_desktop(wm, display),
        Action::LastMonitor => action::last_monitor(wm, display),
        Action::ClientToDesktop(i) => action::client_to_desktop(wm, display, i),
        Action::ClientToMonitor(i) => action::client_to_monitor(wm, display, i),
        Action::TogglePanel => action::togglepanel(wm, display),
        Action::FocusUrgent => action::focusurgent(wm, display),
        Action::MouseMove => mousemotion(wm, display, MouseMode::Move),
        Action::MouseResize => mousemotion(wm, display, MouseMode::Resize),
        Action::Quit(code) => action::quit(wm, code),
    }
}

fn handle_keypress<D: Display>(wm: &mut Wm, display: &mut D, keycode: u32, state: u32) {
    let clean = wm.clean_mask(state);
    let hit = wm
        .key_table
        .iter()
        .find(|k| k.keycode == keycode && wm.clean_mask(k.modifiers) == clean)
        .map(|k| k.action.clone());
    if let Some(act) = hit {
        run_action(wm, display, &act);
    }
}

fn handle_buttonpress<D: Display>(
    wm: &mut Wm,
    display: &mut D,
    button: u32,
    state: u32,
    window: WindowId,
    _root_x: i32,
    _root_y: i32,
) {
    if wm.config.click_to_focus && button == 1 && wm.window_to_client(window).is_some() {
        action::focus(wm, display, Some(window));
    }
    let clean = wm.clean_mask(state);
    let hit = wm
        .button_table
        .iter()
        .find(|b| b.button == button && wm.clean_mask(b.modifiers) == clean)
        .map(|b| b.action.clone());
    if let Some(act) = hit {
        run_action(wm, display, &act);
    }
}

fn handle_clientmessage<D: Display>(wm: &mut Wm, display: &mut D, window: WindowId, fullscreen: FullscreenRequest) {
    let (monitor_idx, mut client) = match wm.window_to_client(window) {
        Some(v) => v,
        None => return,
    };
    let want = match fullscreen {
        FullscreenRequest::Remove => false,
        FullscreenRequest::Add => true,
        FullscreenRequest::Toggle => !client.is_fullscreen,
    };
    setfullscreen(wm, display, monitor_idx, &mut client, want);
}

/// `setfullscreen(c, on)` (spec.md §4.8).
fn setfullscreen<D: Display>(
    wm: &mut Wm,
    display: &mut D,
    monitor_idx: usize,
    client: &mut crate::client::Client,
    on: bool,
) {
    if on != client.is_fullscreen {
        display.set_net_wm_state_fullscreen(client.win, on);
    }
    client.is_fullscreen = on;
    if let Some(c) = wm.monitors[monitor_idx].store.get_mut(client.win) {
        c.is_fullscreen = on;
    }
    if on {
        let mon = &wm.monitors[monitor_idx];
        let (hh, _) = mon.layout_extent(wm.config.panel_height as i32, wm.config.top_panel);
        display.move_resize(client.win, 0, 0, mon.work_area.w, hh.max(0) as u32);
    }
    let win = wm.current().current;
    action::focus(wm, display, win);
}

fn handle_configure_request<D: Display>(
    wm: &mut Wm,
    display: &mut D,
    window: WindowId,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    border_width: u32,
    value_mask: u64,
) {
    if let Some((_, client)) = wm.window_to_client(window) {
        if client.is_fullscreen {
            let mon = wm.current();
            let (hh, _) = mon.layout_extent(wm.config.panel_height as i32, wm.config.top_panel);
            display.configure_window(window, 0, 0, mon.work_area.w, hh.max(0) as u32, 0);
            return;
        }
    }
    let work = wm.current().work_area;
    let bw = wm.border_width();
    let clamped_w = width.min((work.w as i32 - 2 * bw as i32).max(1) as u32);
    let clamped_h = height.min((work.h as i32 - 2 * bw as i32).max(1) as u32);
    let _ = value_mask;
    display.configure_window(window, x, y, clamped_w, clamped_h, border_width);
}

fn handle_remove<D: Display>(wm: &mut Wm, display: &mut D, window: WindowId) {
    if let Some((monitor_idx, _)) = wm.window_to_client(window) {
        let mon = &mut wm.monitors[monitor_idx];
        mon.store.remove(window);
        if mon.current == Some(window) {
            let fallback = mon.store.head().map(|c| c.win);
            mon.current = None;
            if monitor_idx == wm.current_monitor {
                action::focus(wm, display, fallback);
            }
        } else if monitor_idx == wm.current_monitor {
            action::retile(wm, display);
        }
    }
    emit_desktopinfo(wm);
}

fn handle_enternotify<D: Display>(wm: &mut Wm, display: &mut D, window: WindowId) {
    if wm.config.follow_mouse && wm.window_to_client(window).is_some() {
        action::focus(wm, display, Some(window));
    }
}

fn handle_motionnotify<D: Display>(wm: &mut Wm, display: &mut D, root_x: i32, root_y: i32) {
    if !wm.config.follow_monitor {
        return;
    }
    let target = wm.monitor_at(root_x, root_y);
    if target != wm.current_monitor {
        action::change_monitor(wm, display, target);
    }
}

fn handle_propertynotify<D: Display>(wm: &mut Wm, display: &mut D, window: WindowId, atom: Atom) {
    if atom != Atom::WmHints {
        return;
    }
    let urgent = display.get_wm_hints_urgent(window);
    if let Some((monitor_idx, _)) = wm.window_to_client(window) {
        if let Some(c) = wm.monitors[monitor_idx].store.get_mut(window) {
            c.is_urgent = urgent;
        }
    }
    emit_desktopinfo(wm);
}

fn emit_desktopinfo(wm: &Wm) {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = wm.desktopinfo(&mut lock);
}

/// `MapRequest` procedure (spec.md §4.7). `already_existing` is set by
/// startup's adoption pass (spec.md §F) so a window found already mapped
/// doesn't go through the map-on-same-desktop step redundantly.
pub fn handle_map_request<D: Display>(wm: &mut Wm, display: &mut D, window: WindowId, already_existing: bool) {
    let attrs = match display.get_window_attributes(window) {
        Some(a) if !a.override_redirect => a,
        _ => return,
    };
    if wm.window_to_client(window).is_some() {
        return;
    }

    let (class, instance) = display.get_wm_class(window).unwrap_or_default();
    let rule = wm
        .config
        .rules
        .iter()
        .find(|r| r.class == class || r.class == instance)
        .cloned();
    let target_desktop = match &rule {
        Some(r) if r.desktop >= 0 => r.desktop as usize,
        _ => wm.current().current_desktop,
    };
    let follow = rule.as_ref().map(|r| r.follow).unwrap_or(false);
    let rule_floating = rule.as_ref().map(|r| r.floating).unwrap_or(false);

    let saved_desktop = wm.current().current_desktop;
    if target_desktop != saved_desktop && target_desktop < wm.current().desktops.len() {
        wm.current_mut().select_desktop(target_desktop);
    }

    wm.current_mut().store.add(window, wm.current_monitor, wm.config.attach_aside);

    let transient_for = display.get_wm_transient_for(window);
    if let Some(c) = wm.current_mut().store.get_mut(window) {
        c.is_transient = transient_for.is_some();
        c.is_floating = rule_floating || c.is_transient;
    }

    let is_fullscreen_state = display.get_net_wm_state_fullscreen(window);

    display.grab_button(window, 1, 0);
    let win = wm.current().current;
    action::focus(wm, display, win);

    if is_fullscreen_state {
        if let Some((monitor_idx, mut client)) = wm.window_to_client(window) {
            setfullscreen(wm, display, monitor_idx, &mut client, true);
        }
    }

    if target_desktop != saved_desktop {
        wm.current_mut().select_desktop(saved_desktop);
        if follow {
            action::change_desktop(wm, display, target_desktop);
        }
    } else if !already_existing {
        display.map_window(window);
        action::focus(wm, display, Some(window));
    }

    let _ = attrs;
}

/// Which axis the interactive drag loop (spec.md §4.5) is adjusting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    Move,
    Resize,
}

const BUTTON_EVENT_MASK: u64 = 1 << 2 | 1 << 6; // ButtonPress | PointerMotion, approximately

/// `mousemotion(MOVE|RESIZE)` (spec.md §4.5). Runs a nested, re-entrant
/// event loop: `ConfigureRequest`/`MapRequest` are delegated to the normal
/// handlers so new windows opened mid-drag don't deadlock the manager; any
/// key or button event ends the drag.
pub fn mousemotion<D: Display>(wm: &mut Wm, display: &mut D, mode: MouseMode) {
    let win = match wm.current().current {
        Some(w) => w,
        None => return,
    };
    let geometry = match display.get_window_attributes(win) {
        Some(a) => a,
        None => return,
    };
    let (_, mx, my) = match display.query_pointer() {
        Some(p) => p,
        None => return,
    };
    if !display.grab_pointer(display.root(), BUTTON_EVENT_MASK) {
        return;
    }

    if wm.current().store.get(win).map(|c| c.is_fullscreen).unwrap_or(false) {
        if let Some((monitor_idx, mut client)) = wm.window_to_client(win) {
            setfullscreen(wm, display, monitor_idx, &mut client, false);
        }
    }
    if let Some(c) = wm.current_mut().store.get_mut(win) {
        if !c.is_floating {
            c.is_floating = true;
        }
    }
    let win = Some(win);
    action::focus(wm, display, win);
    let win = win.unwrap();

    let min = wm.config.min_window_size;
    loop {
        let event = match display.wait_for_event() {
            Some(e) => e,
            None => break,
        };
        match event {
            Event::MotionNotify { root_x, root_y } => {
                let xw = match mode {
                    MouseMode::Move => geometry.x + (root_x - mx),
                    MouseMode::Resize => geometry.width as i32 + (root_x - mx),
                };
                let yh = match mode {
                    MouseMode::Move => geometry.y + (root_y - my),
                    MouseMode::Resize => geometry.height as i32 + (root_y - my),
                };
                match mode {
                    MouseMode::Resize => {
                        display.resize_window(win, xw.max(min as i32) as u32, yh.max(min as i32) as u32);
                    }
                    MouseMode::Move => {
                        display.move_window(win, xw, yh);
                        let target = wm.monitor_at(xw, yh);
                        if target != wm.current_monitor {
                            action::client_to_monitor(wm, display, target);
                            action::change_monitor(wm, display, target);
                        }
                    }
                }
            }
            Event::ConfigureRequest {
                window,
                x,
                y,
                width,
                height,
                border_width,
                value_mask,
            } => handle_configure_request(wm, display, window, x, y, width, height, border_width, value_mask),
            Event::MapRequest { window } => handle_map_request(wm, display, window, false),
            Event::KeyPress { .. } | Event::ButtonPress { .. } => break,
            _ => {}
        }
    }

    display.ungrab_pointer();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::display::fake::FakeDisplay;
    use crate::display::WindowAttributes;
    use crate::focus::BorderColors;
    use crate::geometry::Rect;

    fn wm() -> Wm {
        let config = Config::default();
        Wm::new(
            vec![Rect::new(0, 0, 1598, 878)],
            config,
            BorderColors { focus: 1, unfocus: 2 },
            0x10,
        )
    }

    #[test]
    fn map_request_ignores_override_redirect_windows() {
        let mut wm = wm();
        let mut d = FakeDisplay::new();
        d.attrs.insert(
            9,
            WindowAttributes {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
                override_redirect: true,
            },
        );
        handle_map_request(&mut wm, &mut d, 9, false);
        assert!(wm.window_to_client(9).is_none());
    }

    #[test]
    fn map_request_tracks_a_plain_window() {
        let mut wm = wm();
        let mut d = FakeDisplay::new();
        d.attrs.insert(
            9,
            WindowAttributes {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
                override_redirect: false,
            },
        );
        handle_map_request(&mut wm, &mut d, 9, false);
        assert!(wm.window_to_client(9).is_some());
        assert!(d.mapped.contains(&9));
    }

    #[test]
    fn destroy_notify_removes_tracked_client() {
        let mut wm = wm();
        let mut d = FakeDisplay::new();
        wm.current_mut().store.add(9, 0, true);
        wm.current_mut().current = Some(9);
        handle_remove(&mut wm, &mut d, 9);
        assert!(wm.window_to_client(9).is_none());
    }

    #[test]
    fn keypress_dispatches_the_matching_binding() {
        let mut wm = wm();
        let mut d = FakeDisplay::new();
        wm.key_table.push(crate::wm::ResolvedKey {
            modifiers: 0,
            keycode: 24,
            action: Action::Quit(7),
        });
        handle_keypress(&mut wm, &mut d, 24, 0);
        assert!(!wm.running);
        assert_eq!(wm.exit_code, 7);
    }
}
