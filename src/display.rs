//! The abstract display capability the rest of the crate is built against.
//!
//! Everything above this module — `client`, `desktop`, `monitor`, `layout`,
//! `focus`, `action`, `event`, `wm` — talks to X only through the `Display`
//! trait below. `src/xlib.rs` provides the one real implementation, built on
//! the `x11` crate in the same direct-Xlib style the teacher's `rdwm.rs`
//! uses; tests use a `FakeDisplay` that never opens a connection.
//!
//! Grounded on `examples/sminez-penrose/src/core/xconnection.rs`'s `XConn`
//! trait, generalizing the teacher's inline unsafe Xlib calls to a seam the
//! manager core can be tested against.

use std::fmt;

/// Opaque window handle. An alias for `x11::xlib::Window` (`c_ulong`) so the
/// core never has to depend on the `x11` crate directly.
pub type WindowId = u64;

/// Normalized input/notification events the dispatcher switches on (spec.md
/// §4.6). `Display` implementations translate raw X events into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    KeyPress {
        keycode: u32,
        state: u32,
    },
    ButtonPress {
        button: u32,
        state: u32,
        window: WindowId,
        root_x: i32,
        root_y: i32,
    },
    MapRequest {
        window: WindowId,
    },
    ConfigureRequest {
        window: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border_width: u32,
        value_mask: u64,
    },
    DestroyNotify {
        window: WindowId,
    },
    UnmapNotify {
        window: WindowId,
        send_event: bool,
    },
    EnterNotify {
        window: WindowId,
        root_x: i32,
        root_y: i32,
    },
    MotionNotify {
        root_x: i32,
        root_y: i32,
    },
    PropertyNotify {
        window: WindowId,
        atom: Atom,
    },
    /// A `_NET_WM_STATE` client message asking to add/remove/toggle
    /// fullscreen. The concrete `Display` is responsible for checking the
    /// message's type and `data[1]`/`data[2]` atoms against its own
    /// interned-atom cache and producing this normalized request; any other
    /// client message is simply not surfaced as an `Event`.
    ClientMessage {
        window: WindowId,
        fullscreen: FullscreenRequest,
    },
}

/// The `data[0]` field of a `_NET_WM_STATE` client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenRequest {
    Remove,
    Add,
    Toggle,
}

/// Interned atoms the manager cares about. `Display` implementations resolve
/// these to real X atoms once at startup and cache them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atom {
    WmProtocols,
    WmDeleteWindow,
    WmHints,
    NetSupported,
    NetWmState,
    NetWmStateFullscreen,
    NetActiveWindow,
    Other(u64),
}

/// A window's geometry and border, as reported by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub override_redirect: bool,
}

/// A key or button binding to grab, in already-cleaned modifier form (see
/// `CLEANMASK` in spec.md §4 Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub modifiers: u32,
    pub code: u32,
}

/// The seam between the manager core and a real or fake X11 connection.
///
/// Every method that can legitimately fail against a live server (a window
/// vanished mid-request, a property was never set) returns `Option` or a
/// default rather than `WmError` — those are per-request failures the
/// caller is expected to tolerate, not fatal conditions (see
/// `src/error.rs`).
pub trait Display: fmt::Debug {
    /// Resolve `names` to atoms, interning any that aren't cached yet.
    fn intern_atoms(&mut self, names: &[&str]) -> Vec<Atom>;

    fn root(&self) -> WindowId;
    fn screen_size(&self) -> (u32, u32);

    /// Discovers the numlock modifier mask by inspecting the keyboard
    /// mapping. Used once at startup to build `CLEANMASK`.
    fn numlock_mask(&mut self) -> u32;

    /// Resolves an X keysym name (e.g. `"Return"`, `"q"`) to a keycode for
    /// `grab_key`/binding-table matching. `None` if the keysym is unknown
    /// to the running X server's keyboard mapping.
    fn keysym_to_keycode(&mut self, name: &str) -> Option<u32>;

    fn select_root_events(&mut self);
    fn grab_key(&mut self, binding: Binding);
    fn grab_button(&mut self, window: WindowId, button: u32, modifiers: u32);
    fn ungrab_pointer(&mut self);
    fn grab_pointer(&mut self, window: WindowId, event_mask: u64) -> bool;

    fn query_pointer(&mut self) -> Option<(WindowId, i32, i32)>;

    fn move_resize(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32);
    fn move_window(&mut self, window: WindowId, x: i32, y: i32);
    fn resize_window(&mut self, window: WindowId, width: u32, height: u32);
    fn set_border_width(&mut self, window: WindowId, width: u32);
    fn set_border_color(&mut self, window: WindowId, color: u64);

    fn raise_window(&mut self, window: WindowId);
    fn map_window(&mut self, window: WindowId);
    fn unmap_window(&mut self, window: WindowId);
    fn configure_window(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32, border_width: u32);

    fn set_input_focus(&mut self, window: WindowId);
    fn set_net_active_window(&mut self, window: Option<WindowId>);

    fn get_window_attributes(&mut self, window: WindowId) -> Option<WindowAttributes>;
    fn get_wm_class(&mut self, window: WindowId) -> Option<(String, String)>;
    fn get_wm_transient_for(&mut self, window: WindowId) -> Option<WindowId>;
    fn get_wm_hints_urgent(&mut self, window: WindowId) -> bool;

    fn get_net_wm_state_fullscreen(&mut self, window: WindowId) -> bool;
    fn set_net_wm_state_fullscreen(&mut self, window: WindowId, enable: bool);

    /// Sends a `WM_DELETE_WINDOW` client message if the window supports
    /// `WM_PROTOCOLS`; returns `false` if the caller should fall back to
    /// `kill_client`.
    fn send_delete(&mut self, window: WindowId) -> bool;
    fn kill_client(&mut self, window: WindowId);

    fn allocate_color(&mut self, name: &str) -> Option<u64>;

    /// Blocks for the next event. Returns `None` on connection loss.
    fn wait_for_event(&mut self) -> Option<Event>;
    fn flush(&mut self);
}

#[cfg(test)]
pub mod fake {
    //! A `Display` that keeps everything in memory, for unit tests that need
    //! to exercise code above the trait (e.g. `action`, `event`) without a
    //! live X server. Individual module test suites build their own minimal
    //! fakes where a full one would be overkill; this one backs the
    //! integration-style tests in `src/event.rs` and `src/action.rs`.
    use super::*;
    use std::collections::{HashMap, VecDeque};

    #[derive(Debug, Default)]
    pub struct FakeDisplay {
        pub root: WindowId,
        pub events: VecDeque<Event>,
        pub attrs: HashMap<WindowId, WindowAttributes>,
        pub transient_for: HashMap<WindowId, WindowId>,
        pub urgent: HashMap<WindowId, bool>,
        pub fullscreen: HashMap<WindowId, bool>,
        pub focused: Option<WindowId>,
        pub active_window: Option<WindowId>,
        pub raised: Vec<WindowId>,
        pub mapped: Vec<WindowId>,
        pub unmapped: Vec<WindowId>,
        pub killed: Vec<WindowId>,
        pub geometry: HashMap<WindowId, (i32, i32, u32, u32)>,
        pub colors: HashMap<String, u64>,
        pub keysyms: HashMap<String, u32>,
    }

    impl FakeDisplay {
        pub fn new() -> Self {
            FakeDisplay {
                root: 1,
                ..Default::default()
            }
        }
    }

    impl Display for FakeDisplay {
        fn intern_atoms(&mut self, names: &[&str]) -> Vec<Atom> {
            names
                .iter()
                .map(|n| match *n {
                    "WM_PROTOCOLS" => Atom::WmProtocols,
                    "WM_DELETE_WINDOW" => Atom::WmDeleteWindow,
                    "WM_HINTS" => Atom::WmHints,
                    "_NET_SUPPORTED" => Atom::NetSupported,
                    "_NET_WM_STATE" => Atom::NetWmState,
                    "_NET_WM_STATE_FULLSCREEN" => Atom::NetWmStateFullscreen,
                    "_NET_ACTIVE_WINDOW" => Atom::NetActiveWindow,
                    _ => Atom::Other(0),
                })
                .collect()
        }

        fn root(&self) -> WindowId {
            self.root
        }

        fn screen_size(&self) -> (u32, u32) {
            (1600, 900)
        }

        fn numlock_mask(&mut self) -> u32 {
            0x10
        }

        fn keysym_to_keycode(&mut self, name: &str) -> Option<u32> {
            self.keysyms.get(name).copied()
        }

        fn select_root_events(&mut self) {}
        fn grab_key(&mut self, _binding: Binding) {}
        fn grab_button(&mut self, _window: WindowId, _button: u32, _modifiers: u32) {}
        fn ungrab_pointer(&mut self) {}
        fn grab_pointer(&mut self, _window: WindowId, _event_mask: u64) -> bool {
            true
        }

        fn query_pointer(&mut self) -> Option<(WindowId, i32, i32)> {
            None
        }

        fn move_resize(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32) {
            self.geometry.insert(window, (x, y, width, height));
        }

        fn move_window(&mut self, window: WindowId, x: i32, y: i32) {
            let e = self.geometry.entry(window).or_insert((0, 0, 1, 1));
            e.0 = x;
            e.1 = y;
        }

        fn resize_window(&mut self, window: WindowId, width: u32, height: u32) {
            let e = self.geometry.entry(window).or_insert((0, 0, 1, 1));
            e.2 = width;
            e.3 = height;
        }

        fn set_border_width(&mut self, _window: WindowId, _width: u32) {}
        fn set_border_color(&mut self, _window: WindowId, _color: u64) {}

        fn raise_window(&mut self, window: WindowId) {
            self.raised.retain(|w| *w != window);
            self.raised.push(window);
        }

        fn map_window(&mut self, window: WindowId) {
            self.mapped.push(window);
        }

        fn unmap_window(&mut self, window: WindowId) {
            self.unmapped.push(window);
        }

        fn configure_window(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32, _border_width: u32) {
            self.geometry.insert(window, (x, y, width, height));
        }

        fn set_input_focus(&mut self, window: WindowId) {
            self.focused = Some(window);
        }

        fn set_net_active_window(&mut self, window: Option<WindowId>) {
            self.active_window = window;
        }

        fn get_window_attributes(&mut self, window: WindowId) -> Option<WindowAttributes> {
            self.attrs.get(&window).copied()
        }

        fn get_wm_class(&mut self, _window: WindowId) -> Option<(String, String)> {
            None
        }

        fn get_wm_transient_for(&mut self, window: WindowId) -> Option<WindowId> {
            self.transient_for.get(&window).copied()
        }

        fn get_wm_hints_urgent(&mut self, window: WindowId) -> bool {
            *self.urgent.get(&window).unwrap_or(&false)
        }

        fn get_net_wm_state_fullscreen(&mut self, window: WindowId) -> bool {
            *self.fullscreen.get(&window).unwrap_or(&false)
        }

        fn set_net_wm_state_fullscreen(&mut self, window: WindowId, enable: bool) {
            self.fullscreen.insert(window, enable);
        }

        fn send_delete(&mut self, _window: WindowId) -> bool {
            false
        }

        fn kill_client(&mut self, window: WindowId) {
            self.killed.push(window);
        }

        fn allocate_color(&mut self, name: &str) -> Option<u64> {
            Some(*self.colors.entry(name.to_string()).or_insert(0))
        }

        fn wait_for_event(&mut self) -> Option<Event> {
            self.events.pop_front()
        }

        fn flush(&mut self) {}
    }
}
