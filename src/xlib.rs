//! Concrete `Display` implementation backed by Xlib, via the `x11` crate.
//!
//! Written in the teacher's own idiom (`examples/blinklad-rdwm/src/rdwm.rs`):
//! a struct wrapping a raw `*mut x11::xlib::Display`, unsafe blocks around
//! each Xlib call, a `lazy_static` flag for the `XSetErrorHandler`-based
//! "another window manager is running" detection.

use std::collections::HashMap;
use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::raw::{c_int, c_uchar, c_ulong};
use std::ptr;
use std::sync::Mutex;

use x11::xlib::{self, Display as XDisplay};

use crate::display::{Atom as WmAtom, Binding, Display, Event, FullscreenRequest, WindowAttributes, WindowId};

lazy_static! {
    static ref WM_DETECTED: Mutex<bool> = Mutex::new(false);
}

/// Raw atom ids resolved once at startup and cached, mirroring the fixed
/// `WmAtom` enum in `src/display.rs`.
struct AtomCache {
    wm_protocols: c_ulong,
    wm_delete_window: c_ulong,
    wm_hints: c_ulong,
    net_supported: c_ulong,
    net_wm_state: c_ulong,
    net_wm_state_fullscreen: c_ulong,
    net_active_window: c_ulong,
}

pub struct XlibDisplay {
    dpy: *mut XDisplay,
    root: WindowId,
    screen: c_int,
    atoms: AtomCache,
    named: HashMap<String, c_ulong>,
}

impl std::fmt::Debug for XlibDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlibDisplay").field("root", &self.root).finish()
    }
}

impl XlibDisplay {
    /// Opens the default X display. `None` on failure (e.g. `$DISPLAY`
    /// unset or the server unreachable) — startup-fatal, turned into
    /// `WmError::DisplayOpenFailed` by the caller.
    pub fn open() -> Option<Self> {
        let dpy = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if dpy.is_null() {
            return None;
        }
        let screen = unsafe { xlib::XDefaultScreen(dpy) };
        let root = unsafe { xlib::XRootWindow(dpy, screen) };

        let atoms = AtomCache {
            wm_protocols: Self::intern(dpy, "WM_PROTOCOLS"),
            wm_delete_window: Self::intern(dpy, "WM_DELETE_WINDOW"),
            wm_hints: Self::intern(dpy, "WM_HINTS"),
            net_supported: Self::intern(dpy, "_NET_SUPPORTED"),
            net_wm_state: Self::intern(dpy, "_NET_WM_STATE"),
            net_wm_state_fullscreen: Self::intern(dpy, "_NET_WM_STATE_FULLSCREEN"),
            net_active_window: Self::intern(dpy, "_NET_ACTIVE_WINDOW"),
        };

        Some(XlibDisplay {
            dpy,
            root: root as WindowId,
            screen,
            atoms,
            named: HashMap::new(),
        })
    }

    fn intern(dpy: *mut XDisplay, name: &str) -> c_ulong {
        let cname = CString::new(name).unwrap();
        unsafe { xlib::XInternAtom(dpy, cname.as_ptr(), xlib::False) }
    }

    /// Installs the detection error handler, attempts to select
    /// `SubstructureRedirectMask` on the root window, and reports whether
    /// another window manager already owns it. Must be called once, right
    /// after `open()`, before any other setup.
    pub fn detect_other_wm(&mut self) -> bool {
        unsafe {
            *WM_DETECTED.lock().unwrap() = false;
            xlib::XSetErrorHandler(Some(Self::on_wm_detected));
            xlib::XSelectInput(
                self.dpy,
                self.root as c_ulong,
                xlib::SubstructureRedirectMask | xlib::SubstructureNotifyMask,
            );
            xlib::XSync(self.dpy, xlib::False);
            xlib::XSetErrorHandler(Some(Self::on_x_error));
        }
        *WM_DETECTED.lock().unwrap()
    }

    unsafe extern "C" fn on_wm_detected(_dpy: *mut XDisplay, event: *mut xlib::XErrorEvent) -> c_int {
        let code = (*event).error_code;
        if code == xlib::BadAccess {
            *WM_DETECTED.lock().unwrap() = true;
        }
        0
    }

    unsafe extern "C" fn on_x_error(_dpy: *mut XDisplay, event: *mut xlib::XErrorEvent) -> c_int {
        error!("X error: request {} code {}", (*event).request_code, (*event).error_code);
        0
    }

    fn query_tree_children(&self) -> Vec<WindowId> {
        let mut root_ret: xlib::Window = 0;
        let mut parent_ret: xlib::Window = 0;
        let mut children: *mut xlib::Window = ptr::null_mut();
        let mut n: u32 = 0;
        let ok = unsafe {
            xlib::XQueryTree(
                self.dpy,
                self.root as c_ulong,
                &mut root_ret,
                &mut parent_ret,
                &mut children,
                &mut n,
            )
        };
        if ok == 0 || children.is_null() {
            return Vec::new();
        }
        let slice = unsafe { std::slice::from_raw_parts(children, n as usize) };
        let result = slice.iter().map(|w| *w as WindowId).collect();
        unsafe {
            xlib::XFree(children as *mut _);
        }
        result
    }

    /// Windows present on the root at startup, for the adoption pass
    /// (spec.md §F).
    pub fn existing_windows(&self) -> Vec<WindowId> {
        self.query_tree_children()
    }

    fn atom_to_wm(&self, raw: c_ulong) -> WmAtom {
        let a = &self.atoms;
        if raw == a.wm_protocols {
            WmAtom::WmProtocols
        } else if raw == a.wm_delete_window {
            WmAtom::WmDeleteWindow
        } else if raw == a.wm_hints {
            WmAtom::WmHints
        } else if raw == a.net_supported {
            WmAtom::NetSupported
        } else if raw == a.net_wm_state {
            WmAtom::NetWmState
        } else if raw == a.net_wm_state_fullscreen {
            WmAtom::NetWmStateFullscreen
        } else if raw == a.net_active_window {
            WmAtom::NetActiveWindow
        } else {
            WmAtom::Other(raw as u64)
        }
    }

    fn translate(&mut self, xevent: xlib::XEvent) -> Option<Event> {
        unsafe {
            match xevent.get_type() {
                xlib::KeyPress => {
                    let e: xlib::XKeyEvent = xevent.into();
                    Some(Event::KeyPress {
                        keycode: e.keycode,
                        state: e.state,
                    })
                }
                xlib::ButtonPress => {
                    let e: xlib::XButtonEvent = xevent.into();
                    Some(Event::ButtonPress {
                        button: e.button,
                        state: e.state,
                        window: e.window as WindowId,
                        root_x: e.x_root,
                        root_y: e.y_root,
                    })
                }
                xlib::MapRequest => {
                    let e: xlib::XMapRequestEvent = xevent.into();
                    Some(Event::MapRequest {
                        window: e.window as WindowId,
                    })
                }
                xlib::ConfigureRequest => {
                    let e: xlib::XConfigureRequestEvent = xevent.into();
                    Some(Event::ConfigureRequest {
                        window: e.window as WindowId,
                        x: e.x,
                        y: e.y,
                        width: e.width.max(1) as u32,
                        height: e.height.max(1) as u32,
                        border_width: e.border_width.max(0) as u32,
                        value_mask: e.value_mask,
                    })
                }
                xlib::DestroyNotify => {
                    let e: xlib::XDestroyWindowEvent = xevent.into();
                    Some(Event::DestroyNotify {
                        window: e.window as WindowId,
                    })
                }
                xlib::UnmapNotify => {
                    let e: xlib::XUnmapEvent = xevent.into();
                    Some(Event::UnmapNotify {
                        window: e.window as WindowId,
                        send_event: e.send_event != 0,
                    })
                }
                xlib::EnterNotify => {
                    let e: xlib::XCrossingEvent = xevent.into();
                    if e.detail == xlib::NotifyInferior {
                        None
                    } else {
                        Some(Event::EnterNotify {
                            window: e.window as WindowId,
                            root_x: e.x_root,
                            root_y: e.y_root,
                        })
                    }
                }
                xlib::MotionNotify => {
                    let e: xlib::XMotionEvent = xevent.into();
                    Some(Event::MotionNotify {
                        root_x: e.x_root,
                        root_y: e.y_root,
                    })
                }
                xlib::PropertyNotify => {
                    let e: xlib::XPropertyEvent = xevent.into();
                    Some(Event::PropertyNotify {
                        window: e.window as WindowId,
                        atom: self.atom_to_wm(e.atom),
                    })
                }
                xlib::ClientMessage => {
                    let e: xlib::XClientMessageEvent = xevent.into();
                    if e.message_type != self.atoms.net_wm_state {
                        return None;
                    }
                    let data = e.data.as_longs();
                    let is_fs = |v: i64| v as c_ulong == self.atoms.net_wm_state_fullscreen;
                    if !is_fs(data[1]) && !is_fs(data[2]) {
                        return None;
                    }
                    let fullscreen = match data[0] {
                        0 => FullscreenRequest::Remove,
                        1 => FullscreenRequest::Add,
                        _ => FullscreenRequest::Toggle,
                    };
                    Some(Event::ClientMessage {
                        window: e.window as WindowId,
                        fullscreen,
                    })
                }
                _ => None,
            }
        }
    }
}

impl Display for XlibDisplay {
    fn intern_atoms(&mut self, names: &[&str]) -> Vec<WmAtom> {
        names
            .iter()
            .map(|n| {
                let raw = *self
                    .named
                    .entry(n.to_string())
                    .or_insert_with(|| Self::intern(self.dpy, n));
                self.atom_to_wm(raw)
            })
            .collect()
    }

    fn root(&self) -> WindowId {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        unsafe {
            (
                xlib::XDisplayWidth(self.dpy, self.screen) as u32,
                xlib::XDisplayHeight(self.dpy, self.screen) as u32,
            )
        }
    }

    fn numlock_mask(&mut self) -> u32 {
        unsafe {
            let modmap = xlib::XGetModifierMapping(self.dpy);
            if modmap.is_null() {
                return 0;
            }
            let mm = &*modmap;
            let numlock_keycode = xlib::XKeysymToKeycode(self.dpy, x11::keysym::XK_Num_Lock as xlib::KeySym);
            let mut mask = 0u32;
            for i in 0..8 {
                for j in 0..mm.max_keypermod {
                    let idx = (i * mm.max_keypermod + j) as isize;
                    let code = *mm.modifiermap.offset(idx);
                    if code == numlock_keycode && code != 0 {
                        mask = 1 << i;
                    }
                }
            }
            xlib::XFreeModifiermap(modmap);
            mask
        }
    }

    fn keysym_to_keycode(&mut self, name: &str) -> Option<u32> {
        let cname = CString::new(name).ok()?;
        let keysym = unsafe { xlib::XStringToKeysym(cname.as_ptr()) };
        if keysym == 0 {
            return None;
        }
        let code = unsafe { xlib::XKeysymToKeycode(self.dpy, keysym) };
        if code == 0 {
            None
        } else {
            Some(code as u32)
        }
    }

    fn select_root_events(&mut self) {
        unsafe {
            xlib::XSelectInput(
                self.dpy,
                self.root as c_ulong,
                xlib::SubstructureRedirectMask
                    | xlib::SubstructureNotifyMask
                    | xlib::PropertyChangeMask
                    | xlib::ButtonPressMask,
            );
        }
    }

    fn grab_key(&mut self, binding: Binding) {
        unsafe {
            xlib::XGrabKey(
                self.dpy,
                binding.code as c_int,
                binding.modifiers as u32,
                self.root as c_ulong,
                xlib::True,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
            );
        }
    }

    fn grab_button(&mut self, window: WindowId, button: u32, modifiers: u32) {
        unsafe {
            xlib::XGrabButton(
                self.dpy,
                button,
                modifiers,
                window as c_ulong,
                xlib::False,
                (xlib::ButtonPressMask | xlib::ButtonReleaseMask) as u32,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
                0,
                0,
            );
        }
    }

    fn ungrab_pointer(&mut self) {
        unsafe {
            xlib::XUngrabPointer(self.dpy, xlib::CurrentTime);
        }
    }

    fn grab_pointer(&mut self, window: WindowId, event_mask: u64) -> bool {
        let result = unsafe {
            xlib::XGrabPointer(
                self.dpy,
                window as c_ulong,
                xlib::False,
                event_mask as u32,
                xlib::GrabModeAsync,
                xlib::GrabModeAsync,
                0,
                0,
                xlib::CurrentTime,
            )
        };
        result == xlib::GrabSuccess
    }

    fn query_pointer(&mut self) -> Option<(WindowId, i32, i32)> {
        unsafe {
            let mut root_ret: xlib::Window = 0;
            let mut child_ret: xlib::Window = 0;
            let (mut root_x, mut root_y, mut win_x, mut win_y) = (0, 0, 0, 0);
            let mut mask = 0u32;
            let ok = xlib::XQueryPointer(
                self.dpy,
                self.root as c_ulong,
                &mut root_ret,
                &mut child_ret,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            );
            if ok == 0 {
                None
            } else {
                Some((child_ret as WindowId, root_x, root_y))
            }
        }
    }

    fn move_resize(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32) {
        unsafe {
            xlib::XMoveResizeWindow(self.dpy, window as c_ulong, x, y, width, height);
        }
    }

    fn move_window(&mut self, window: WindowId, x: i32, y: i32) {
        unsafe {
            xlib::XMoveWindow(self.dpy, window as c_ulong, x, y);
        }
    }

    fn resize_window(&mut self, window: WindowId, width: u32, height: u32) {
        unsafe {
            xlib::XResizeWindow(self.dpy, window as c_ulong, width.max(1), height.max(1));
        }
    }

    fn set_border_width(&mut self, window: WindowId, width: u32) {
        unsafe {
            xlib::XSetWindowBorderWidth(self.dpy, window as c_ulong, width);
        }
    }

    fn set_border_color(&mut self, window: WindowId, color: u64) {
        unsafe {
            xlib::XSetWindowBorder(self.dpy, window as c_ulong, color);
        }
    }

    fn raise_window(&mut self, window: WindowId) {
        unsafe {
            xlib::XRaiseWindow(self.dpy, window as c_ulong);
        }
    }

    fn map_window(&mut self, window: WindowId) {
        unsafe {
            xlib::XMapWindow(self.dpy, window as c_ulong);
        }
    }

    fn unmap_window(&mut self, window: WindowId) {
        unsafe {
            xlib::XUnmapWindow(self.dpy, window as c_ulong);
        }
    }

    fn configure_window(&mut self, window: WindowId, x: i32, y: i32, width: u32, height: u32, border_width: u32) {
        unsafe {
            let mut changes = xlib::XWindowChanges {
                x,
                y,
                width: width as c_int,
                height: height as c_int,
                border_width: border_width as c_int,
                sibling: 0,
                stack_mode: 0,
            };
            let mask = (xlib::CWX | xlib::CWY | xlib::CWWidth | xlib::CWHeight | xlib::CWBorderWidth) as u32;
            xlib::XConfigureWindow(self.dpy, window as c_ulong, mask, &mut changes);
        }
    }

    fn set_input_focus(&mut self, window: WindowId) {
        unsafe {
            xlib::XSetInputFocus(self.dpy, window as c_ulong, xlib::RevertToPointerRoot, xlib::CurrentTime);
        }
    }

    fn set_net_active_window(&mut self, window: Option<WindowId>) {
        unsafe {
            match window {
                Some(w) => {
                    let data = [w as c_ulong];
                    xlib::XChangeProperty(
                        self.dpy,
                        self.root as c_ulong,
                        self.atoms.net_active_window,
                        xlib::XA_WINDOW,
                        32,
                        xlib::PropModeReplace,
                        data.as_ptr() as *const c_uchar,
                        1,
                    );
                }
                None => {
                    xlib::XDeleteProperty(self.dpy, self.root as c_ulong, self.atoms.net_active_window);
                }
            }
        }
    }

    fn get_window_attributes(&mut self, window: WindowId) -> Option<WindowAttributes> {
        unsafe {
            let mut attrs: xlib::XWindowAttributes = MaybeUninit::zeroed().assume_init();
            let ok = xlib::XGetWindowAttributes(self.dpy, window as c_ulong, &mut attrs);
            if ok == 0 {
                None
            } else {
                Some(WindowAttributes {
                    x: attrs.x,
                    y: attrs.y,
                    width: attrs.width.max(1) as u32,
                    height: attrs.height.max(1) as u32,
                    override_redirect: attrs.override_redirect != 0,
                })
            }
        }
    }

    fn get_wm_class(&mut self, window: WindowId) -> Option<(String, String)> {
        unsafe {
            let mut hint: xlib::XClassHint = MaybeUninit::zeroed().assume_init();
            let ok = xlib::XGetClassHint(self.dpy, window as c_ulong, &mut hint);
            if ok == 0 {
                return None;
            }
            let class = std::ffi::CStr::from_ptr(hint.res_class).to_string_lossy().into_owned();
            let instance = std::ffi::CStr::from_ptr(hint.res_name).to_string_lossy().into_owned();
            xlib::XFree(hint.res_class as *mut _);
            xlib::XFree(hint.res_name as *mut _);
            Some((class, instance))
        }
    }

    fn get_wm_transient_for(&mut self, window: WindowId) -> Option<WindowId> {
        unsafe {
            let mut transient: xlib::Window = 0;
            let ok = xlib::XGetTransientForHint(self.dpy, window as c_ulong, &mut transient);
            if ok == 0 || transient == 0 {
                None
            } else {
                Some(transient as WindowId)
            }
        }
    }

    fn get_wm_hints_urgent(&mut self, window: WindowId) -> bool {
        unsafe {
            let hints = xlib::XGetWMHints(self.dpy, window as c_ulong);
            if hints.is_null() {
                return false;
            }
            let urgent = (*hints).flags & xlib::XUrgencyHint != 0;
            xlib::XFree(hints as *mut _);
            urgent
        }
    }

    fn get_net_wm_state_fullscreen(&mut self, window: WindowId) -> bool {
        unsafe {
            let (mut actual_type, mut actual_format) = (0, 0);
            let (mut n_items, mut bytes_after) = (0, 0);
            let mut prop: *mut c_uchar = ptr::null_mut();
            let ok = xlib::XGetWindowProperty(
                self.dpy,
                window as c_ulong,
                self.atoms.net_wm_state,
                0,
                !0,
                xlib::False,
                xlib::XA_ATOM,
                &mut actual_type,
                &mut actual_format,
                &mut n_items,
                &mut bytes_after,
                &mut prop,
            );
            if ok != 0 || prop.is_null() {
                return false;
            }
            let atoms = std::slice::from_raw_parts(prop as *const c_ulong, n_items as usize);
            let found = atoms.iter().any(|a| *a == self.atoms.net_wm_state_fullscreen);
            xlib::XFree(prop as *mut _);
            found
        }
    }

    fn set_net_wm_state_fullscreen(&mut self, window: WindowId, enable: bool) {
        unsafe {
            if enable {
                let data = [self.atoms.net_wm_state_fullscreen];
                xlib::XChangeProperty(
                    self.dpy,
                    window as c_ulong,
                    self.atoms.net_wm_state,
                    xlib::XA_ATOM,
                    32,
                    xlib::PropModeReplace,
                    data.as_ptr() as *const c_uchar,
                    1,
                );
            } else {
                xlib::XDeleteProperty(self.dpy, window as c_ulong, self.atoms.net_wm_state);
            }
        }
    }

    fn send_delete(&mut self, window: WindowId) -> bool {
        unsafe {
            let mut protocols: *mut xlib::Atom = ptr::null_mut();
            let mut count = 0;
            let ok = xlib::XGetWMProtocols(self.dpy, window as c_ulong, &mut protocols, &mut count);
            let supports_delete = ok != 0
                && !protocols.is_null()
                && std::slice::from_raw_parts(protocols, count as usize).contains(&self.atoms.wm_delete_window);
            if !protocols.is_null() {
                xlib::XFree(protocols as *mut _);
            }
            if !supports_delete {
                return false;
            }
            let mut event: xlib::XClientMessageEvent = MaybeUninit::zeroed().assume_init();
            event.type_ = xlib::ClientMessage;
            event.window = window as c_ulong;
            event.message_type = self.atoms.wm_protocols;
            event.format = 32;
            event.data.set_long(0, self.atoms.wm_delete_window as i64);
            event.data.set_long(1, xlib::CurrentTime as i64);
            let mut xevent = xlib::XEvent::from(event);
            xlib::XSendEvent(self.dpy, window as c_ulong, xlib::False, xlib::NoEventMask, &mut xevent);
            true
        }
    }

    fn kill_client(&mut self, window: WindowId) {
        unsafe {
            xlib::XKillClient(self.dpy, window as c_ulong);
        }
    }

    fn allocate_color(&mut self, name: &str) -> Option<u64> {
        unsafe {
            let colormap = xlib::XDefaultColormap(self.dpy, self.screen);
            let cname = CString::new(name).ok()?;
            let mut color: xlib::XColor = MaybeUninit::zeroed().assume_init();
            let ok = xlib::XAllocNamedColor(self.dpy, colormap, cname.as_ptr(), &mut color, &mut color);
            if ok == 0 {
                None
            } else {
                Some(color.pixel as u64)
            }
        }
    }

    fn wait_for_event(&mut self) -> Option<Event> {
        loop {
            let mut xevent: xlib::XEvent = unsafe { MaybeUninit::zeroed().assume_init() };
            unsafe {
                xlib::XNextEvent(self.dpy, &mut xevent);
            }
            if let Some(event) = self.translate(xevent) {
                return Some(event);
            }
            // Events we don't surface (e.g. a stray ClientMessage, an
            // EnterNotify with detail == Inferior) are swallowed here and
            // the next event is fetched, matching the original's behavior
            // of simply falling off the end of the `switch`.
        }
    }

    fn flush(&mut self) {
        unsafe {
            xlib::XFlush(self.dpy);
        }
    }
}

impl Drop for XlibDisplay {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.dpy);
        }
    }
}
