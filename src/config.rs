//! Configuration loading: TOML file, layered over compiled-in defaults,
//! resolved against the fixed `Action` enum the action layer understands.
//!
//! Keeps the teacher's shape (`blinklad-rdwm/src/config.rs`): a `serde` +
//! `toml` struct, `Option<...>` sections so a partial file is valid, and an
//! inline `#[test]`. What changes is the load order (XDG lookup via the
//! `xdg` crate, then compiled defaults, matching monsterwm's `config.h`
//! rather than a single hardcoded path) and the binding tables, which now
//! resolve to a typed `Action` instead of a free-form command string.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use x11::xlib::{ControlMask, LockMask, Mod1Mask, Mod4Mask, ShiftMask};

use crate::desktop::Mode;

const APP_NAME: &str = "driftwm";

/// A keybinding/button-binding action, resolved from the config's free-form
/// `action`/`arg` fields (spec.md §6: `keys[]`, `buttons[]`). Mirrors the
/// action layer in `src/action.rs` one-to-one.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Spawn(Vec<String>),
    KillClient,
    NextWindow,
    PrevWindow,
    MoveUp,
    MoveDown,
    SwapMaster,
    SwitchMode(Mode),
    ResizeMaster(i32),
    ResizeStack(i32),
    Rotate(i32),
    RotateFilled(i32),
    RotateMonitor(i32),
    ChangeDesktop(usize),
    ChangeMonitor(usize),
    LastDesktop,
    LastMonitor,
    ClientToDesktop(usize),
    ClientToMonitor(usize),
    TogglePanel,
    FocusUrgent,
    MouseMove,
    MouseResize,
    Quit(i32),
}

/// Untyped `arg` as read from TOML — either an integer or a command line,
/// resolved into a concrete `Action` once the `action` name is known.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawArg {
    Int(i32),
    Command(Vec<String>),
    None,
}

impl Default for RawArg {
    fn default() -> Self {
        RawArg::None
    }
}

fn resolve_action(name: &str, arg: &RawArg) -> Option<Action> {
    let int_arg = || match arg {
        RawArg::Int(i) => *i,
        _ => 0,
    };
    Some(match name {
        "spawn" => Action::Spawn(match arg {
            RawArg::Command(v) => v.clone(),
            _ => return None,
        }),
        "killclient" => Action::KillClient,
        "next_win" => Action::NextWindow,
        "prev_win" => Action::PrevWindow,
        "move_up" => Action::MoveUp,
        "move_down" => Action::MoveDown,
        "swap_master" => Action::SwapMaster,
        "switch_mode_tile" => Action::SwitchMode(Mode::Tile),
        "switch_mode_monocle" => Action::SwitchMode(Mode::Monocle),
        "switch_mode_bstack" => Action::SwitchMode(Mode::Bstack),
        "switch_mode_grid" => Action::SwitchMode(Mode::Grid),
        "resize_master" => Action::ResizeMaster(int_arg()),
        "resize_stack" => Action::ResizeStack(int_arg()),
        "rotate" => Action::Rotate(int_arg()),
        "rotate_filled" => Action::RotateFilled(int_arg()),
        "rotate_monitor" => Action::RotateMonitor(int_arg()),
        "change_desktop" => Action::ChangeDesktop(int_arg().max(0) as usize),
        "change_monitor" => Action::ChangeMonitor(int_arg().max(0) as usize),
        "last_desktop" => Action::LastDesktop,
        "last_monitor" => Action::LastMonitor,
        "client_to_desktop" => Action::ClientToDesktop(int_arg().max(0) as usize),
        "client_to_monitor" => Action::ClientToMonitor(int_arg().max(0) as usize),
        "togglepanel" => Action::TogglePanel,
        "focusurgent" => Action::FocusUrgent,
        "mousemove" => Action::MouseMove,
        "mouseresize" => Action::MouseResize,
        "quit" => Action::Quit(int_arg()),
        _ => {
            warn!("ignoring binding with unknown action {:?}", name);
            return None;
        }
    })
}

fn modifier_mask(name: &str) -> Option<u32> {
    Some(match name {
        "mod1" | "alt" => Mod1Mask,
        "mod4" | "super" | "mod" => Mod4Mask,
        "shift" => ShiftMask,
        "control" | "ctrl" => ControlMask,
        "lock" => LockMask,
        _ => return None,
    })
}

fn modifiers_mask(names: &[String]) -> u32 {
    names.iter().filter_map(|n| modifier_mask(n)).fold(0, |a, b| a | b)
}

#[derive(Debug, Deserialize)]
struct RawKeyBinding {
    #[serde(rename = "mod", default)]
    modifiers: Vec<String>,
    key: String,
    action: String,
    #[serde(default)]
    arg: RawArg,
}

#[derive(Debug, Deserialize)]
struct RawButtonBinding {
    #[serde(rename = "mod", default)]
    modifiers: Vec<String>,
    button: u32,
    action: String,
    #[serde(default)]
    arg: RawArg,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    class: String,
    #[serde(default = "default_rule_desktop")]
    desktop: i32,
    #[serde(default)]
    follow: bool,
    #[serde(default)]
    floating: bool,
}

fn default_rule_desktop() -> i32 {
    -1
}

/// A resolved keybinding: cleaned modifier mask, the X keysym name (resolved
/// to a keycode by the `Display` at grab time), and the action to run.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub modifiers: u32,
    pub keysym_name: String,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub struct ButtonBinding {
    pub modifiers: u32,
    pub button: u32,
    pub action: Action,
}

/// A rule matched against `WM_CLASS` at `MapRequest` time (spec.md §4.7
/// step 3). `desktop < 0` means "current desktop".
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub class: String,
    pub desktop: i32,
    pub follow: bool,
    pub floating: bool,
}

#[derive(Debug, Deserialize, Default)]
struct GeneralSettings {
    mod_key: Option<String>,
    master_size: Option<f64>,
    default_mode: Option<String>,
    default_desktop: Option<usize>,
    default_monitor: Option<usize>,
    desktops: Option<usize>,
    show_panel: Option<bool>,
    top_panel: Option<bool>,
    panel_height: Option<u32>,
    min_window_size: Option<u32>,
    follow_mouse: Option<bool>,
    follow_monitor: Option<bool>,
    follow_window: Option<bool>,
    click_to_focus: Option<bool>,
    attach_aside: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct BorderSettings {
    width: Option<u32>,
    focus_color: Option<String>,
    unfocus_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    general: Option<GeneralSettings>,
    border: Option<BorderSettings>,
    #[serde(rename = "binding", default)]
    keys: Vec<RawKeyBinding>,
    #[serde(rename = "buttonbinding", default)]
    buttons: Vec<RawButtonBinding>,
    #[serde(rename = "rule", default)]
    rules: Vec<RawRule>,
}

/// Fully-resolved, immutable runtime configuration (spec.md §3 "Global
/// state" and §6 "Configuration"). Built once at startup; the core never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Config {
    pub master_size: f64,
    pub default_mode: Mode,
    pub default_desktop: usize,
    pub default_monitor: usize,
    pub desktops: usize,
    pub show_panel: bool,
    pub top_panel: bool,
    pub panel_height: u32,
    pub border_width: u32,
    pub focus_color: String,
    pub unfocus_color: String,
    pub min_window_size: u32,
    pub follow_mouse: bool,
    pub follow_monitor: bool,
    pub follow_window: bool,
    pub click_to_focus: bool,
    pub attach_aside: bool,
    pub keys: Vec<KeyBinding>,
    pub buttons: Vec<ButtonBinding>,
    pub rules: Vec<Rule>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            master_size: 0.52,
            default_mode: Mode::Tile,
            default_desktop: 0,
            default_monitor: 0,
            desktops: 5,
            show_panel: true,
            top_panel: true,
            panel_height: 20,
            border_width: 2,
            focus_color: "#5f316d".to_string(),
            unfocus_color: "#333333".to_string(),
            min_window_size: 50,
            follow_mouse: false,
            follow_monitor: false,
            follow_window: false,
            click_to_focus: true,
            attach_aside: true,
            keys: Vec::new(),
            buttons: Vec::new(),
            rules: Vec::new(),
        }
    }
}

fn parse_mode(name: &str) -> Option<Mode> {
    Some(match name.to_ascii_lowercase().as_str() {
        "tile" => Mode::Tile,
        "monocle" => Mode::Monocle,
        "bstack" => Mode::Bstack,
        "grid" => Mode::Grid,
        _ => return None,
    })
}

impl Config {
    /// Loads configuration from, in order: `path` if given, else
    /// `$XDG_CONFIG_HOME/driftwm/config.toml`, else compiled defaults. A
    /// missing file at any stage is not an error — every field defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let text = match path {
            Some(p) => fs::read_to_string(p).ok(),
            None => Self::xdg_config_path().and_then(|p| fs::read_to_string(p).ok()),
        };

        let raw: RawConfig = match text {
            Some(t) => toml::from_str(&t).unwrap_or_else(|e| {
                warn!("config file is malformed ({}), falling back to defaults", e);
                RawConfig::default()
            }),
            None => RawConfig::default(),
        };

        Self::from_raw(raw)
    }

    fn xdg_config_path() -> Option<PathBuf> {
        let dirs = xdg::BaseDirectories::with_prefix(APP_NAME).ok()?;
        dirs.find_config_file("config.toml")
    }

    fn from_raw(raw: RawConfig) -> Self {
        let mut cfg = Config::default();

        if let Some(g) = raw.general {
            if let Some(v) = g.master_size {
                cfg.master_size = v;
            }
            if let Some(v) = g.default_mode.as_deref().and_then(parse_mode) {
                cfg.default_mode = v;
            }
            if let Some(v) = g.default_desktop {
                cfg.default_desktop = v;
            }
            if let Some(v) = g.default_monitor {
                cfg.default_monitor = v;
            }
            if let Some(v) = g.desktops {
                cfg.desktops = v;
            }
            if let Some(v) = g.show_panel {
                cfg.show_panel = v;
            }
            if let Some(v) = g.top_panel {
                cfg.top_panel = v;
            }
            if let Some(v) = g.panel_height {
                cfg.panel_height = v;
            }
            if let Some(v) = g.min_window_size {
                cfg.min_window_size = v;
            }
            if let Some(v) = g.follow_mouse {
                cfg.follow_mouse = v;
            }
            if let Some(v) = g.follow_monitor {
                cfg.follow_monitor = v;
            }
            if let Some(v) = g.follow_window {
                cfg.follow_window = v;
            }
            if let Some(v) = g.click_to_focus {
                cfg.click_to_focus = v;
            }
            if let Some(v) = g.attach_aside {
                cfg.attach_aside = v;
            }
        }

        if let Some(b) = raw.border {
            if let Some(v) = b.width {
                cfg.border_width = v;
            }
            if let Some(v) = b.focus_color {
                cfg.focus_color = v;
            }
            if let Some(v) = b.unfocus_color {
                cfg.unfocus_color = v;
            }
        }

        for k in raw.keys {
            if let Some(action) = resolve_action(&k.action, &k.arg) {
                cfg.keys.push(KeyBinding {
                    modifiers: modifiers_mask(&k.modifiers),
                    keysym_name: k.key,
                    action,
                });
            }
        }

        for b in raw.buttons {
            if let Some(action) = resolve_action(&b.action, &b.arg) {
                cfg.buttons.push(ButtonBinding {
                    modifiers: modifiers_mask(&b.modifiers),
                    button: b.button,
                    action,
                });
            }
        }

        for r in raw.rules {
            cfg.rules.push(Rule {
                class: r.class,
                desktop: r.desktop,
                follow: r.follow,
                floating: r.floating,
            });
        }

        debug!("{:#?}", cfg);
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let cfg = Config::default();
        assert_eq!(cfg.master_size, 0.52);
        assert_eq!(cfg.default_mode, Mode::Tile);
        assert_eq!(cfg.desktops, 5);
        assert_eq!(cfg.border_width, 2);
        assert!(cfg.attach_aside);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let raw: RawConfig = toml::from_str(
            r#"
            [general]
            master_size = 0.6
            desktops = 3

            [[binding]]
            mod = ["mod4"]
            key = "Return"
            action = "spawn"
            arg = ["alacritty"]

            [[rule]]
            class = "Gimp"
            desktop = 2
            floating = true
            "#,
        )
        .unwrap();
        let cfg = Config::from_raw(raw);
        assert_eq!(cfg.master_size, 0.6);
        assert_eq!(cfg.desktops, 3);
        assert_eq!(cfg.border_width, 2); // untouched, still the default
        assert_eq!(cfg.keys.len(), 1);
        assert_eq!(cfg.keys[0].action, Action::Spawn(vec!["alacritty".to_string()]));
        assert_eq!(cfg.rules.len(), 1);
        assert_eq!(cfg.rules[0].desktop, 2);
    }

    #[test]
    fn unknown_action_name_is_skipped_not_fatal() {
        let raw: RawConfig = toml::from_str(
            r#"
            [[binding]]
            mod = ["mod4"]
            key = "x"
            action = "does_not_exist"
            "#,
        )
        .unwrap();
        let cfg = Config::from_raw(raw);
        assert!(cfg.keys.is_empty());
    }
}
