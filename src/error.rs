use thiserror::Error;

/// Errors that abort the process outright. Per-request X failures (a bad
/// geometry reply, a missing WM_CLASS, ...) are never represented here — the
/// `Display` trait absorbs those as `None`/defaults at the call site.
#[derive(Debug, Error)]
pub enum WmError {
    #[error("could not open connection to the X display")]
    DisplayOpenFailed,

    #[error("another window manager is already running")]
    OtherWmRunning,

    #[error("could not allocate monitor or desktop storage")]
    MonitorAllocFailed,

    #[error("could not install SIGCHLD handler")]
    SignalInstallFailed,

    #[error("could not allocate color '{0}'")]
    ColorAllocFailed(String),

    #[error("could not determine the numlock modifier mask")]
    KeyboardSetupFailed,

    #[error("the X11 connection was interrupted")]
    ConnectionLost,

    #[error("could not read configuration: {0}")]
    ConfigError(String),
}

pub type WmResult<T> = Result<T, WmError>;
