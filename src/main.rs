#[macro_use]
extern crate log;

use std::env;
use std::process::ExitCode;

use driftwm::config::Config;
use driftwm::display::{Binding, Display, Event};
use driftwm::error::{WmError, WmResult};
use driftwm::focus::BorderColors;
use driftwm::geometry::Rect;
use driftwm::wm::Wm;
use driftwm::xlib::XlibDisplay;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    env_logger::builder().format_timestamp(None).init();

    let args: Vec<String> = env::args().collect();
    let config_path = match parse_args(&args[1..]) {
        Ok(path) => path,
        Err(code) => return ExitCode::from(code),
    };

    info!("starting {} {}", NAME, VERSION);
    match run(config_path.as_deref()) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Parses argv: no arguments runs the WM, `-v` prints name/version and
/// exits 0, anything else is a usage error. `--config <path>` is accepted
/// as an additional option alongside that contract.
fn parse_args(args: &[String]) -> Result<Option<String>, u8> {
    let mut config_path = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-v" | "--version" => {
                println!("{} {}", NAME, VERSION);
                return Err(0);
            }
            "--config" => {
                let path = args.get(i + 1).ok_or(1u8)?;
                config_path = Some(path.clone());
                i += 2;
            }
            _ => {
                eprintln!("usage: {} [-v] [--config <path>]", NAME);
                return Err(1);
            }
        }
    }
    Ok(config_path)
}

fn run(config_path: Option<&str>) -> WmResult<i32> {
    let config = Config::load(config_path.map(std::path::Path::new));

    let mut display = XlibDisplay::open().ok_or(WmError::DisplayOpenFailed)?;
    if display.detect_other_wm() {
        return Err(WmError::OtherWmRunning);
    }
    info!("connected to display, root window is {:?}", display.root());

    let focus_color = display
        .allocate_color(&config.focus_color)
        .ok_or_else(|| WmError::ColorAllocFailed(config.focus_color.clone()))?;
    let unfocus_color = display
        .allocate_color(&config.unfocus_color)
        .ok_or_else(|| WmError::ColorAllocFailed(config.unfocus_color.clone()))?;
    let colors = BorderColors {
        focus: focus_color,
        unfocus: unfocus_color,
    };

    let numlock_mask = display.numlock_mask();

    let (screen_w, screen_h) = display.screen_size();
    let screens = vec![Rect::new(0, 0, screen_w, screen_h)];

    let mut wm = Wm::new(screens, config, colors, numlock_mask);
    wm.resolve_bindings(&mut display);

    display.select_root_events();
    for binding in key_bindings(&wm) {
        display.grab_key(binding);
    }

    install_sigchld_handler()?;

    let existing = display.existing_windows();
    wm.adopt_existing(&mut display, &existing);
    emit_desktopinfo(&wm);
    display.flush();

    info!("entering event loop");
    while wm.running {
        match display.wait_for_event() {
            Some(event) => driftwm::event::dispatch(&mut wm, &mut display, event),
            None => return Err(WmError::ConnectionLost),
        }
    }

    info!("shutting down");
    wm.cleanup(&mut display);
    Ok(wm.exit_code)
}

fn key_bindings(wm: &Wm) -> Vec<Binding> {
    wm.key_table
        .iter()
        .map(|k| Binding {
            modifiers: k.modifiers,
            code: k.keycode,
        })
        .collect()
}

fn emit_desktopinfo(wm: &Wm) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = wm.desktopinfo(&mut handle);
}

/// Reaps zombie children of `spawn`-launched programs: install once, reap
/// with `WNOHANG` until none remain, same role as the original's `sigchld()`.
fn install_sigchld_handler() -> WmResult<()> {
    use nix::sys::signal::{self, SigHandler, Signal};

    extern "C" fn reap(_: i32) {
        use nix::sys::wait::{waitpid, WaitPidFlag};
        use nix::unistd::Pid;
        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(nix::sys::wait::WaitStatus::StillAlive) | Err(_) => break,
                Ok(nix::sys::wait::WaitStatus::Exited(..)) | Ok(nix::sys::wait::WaitStatus::Signaled(..)) => continue,
                _ => break,
            }
        }
    }

    unsafe {
        signal::signal(Signal::SIGCHLD, SigHandler::Handler(reap)).map_err(|_| WmError::SignalInstallFailed)?;
    }
    Ok(())
}
