//! Core of the window manager: the client store, desktop/monitor state,
//! layout engines, focus engine, action layer, event dispatcher and the
//! abstract display seam they're all built against. Exposed as a library so
//! it can be unit tested without a live X server; `src/main.rs` is the thin
//! binary that wires a real `Display` implementation around it.

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;

pub mod action;
pub mod client;
pub mod config;
pub mod desktop;
pub mod display;
pub mod error;
pub mod event;
pub mod focus;
pub mod geometry;
pub mod layout;
pub mod monitor;
pub mod wm;
pub mod xlib;
