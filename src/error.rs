use thiserror::Error;

/// Failure modes of a single build or flash attempt.
///
/// Every variant aborts the current operation; no retries happen at this
/// layer. Output already forwarded to the sink before the failure is not
/// retracted.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Workspace or sketch-file I/O failed before the tool was spawned.
    #[error("workspace I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The external tool binary is missing or not runnable.
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Build tool exit code 1.
    #[error("compilation failed")]
    BuildFailed,

    /// Build tool exit code 2.
    #[error("sketch file not found")]
    SketchNotFound,

    /// Build tool exit code 3.
    #[error("invalid build arguments")]
    InvalidArguments,

    /// Build tool exit code 4.
    #[error("unknown build preference")]
    UnknownPreference,

    /// Programmer tool exit code 1.
    #[error("flashing failed")]
    FlashFailed,

    /// Bootloader rediscovery found no peripheral resolving to the expected
    /// device name.
    #[error("expected {device} to appear on the serial bus, but it was not found")]
    DeviceNotFound { device: String },

    /// The serial transport refused to open or close the connection.
    #[error("serial transport error on {path}: {message}")]
    Transport { path: String, message: String },

    /// No realtime firmware artifact is known for the board.
    #[error("no realtime firmware is available for board {fqbn}")]
    NoRealtimeFirmware { fqbn: String },

    /// Catch-all for exit codes the tool contracts do not document.
    /// A signal-terminated child reports code -1.
    #[error("{tool} exited with unrecognized code {code}")]
    UnrecognizedExitCode { tool: &'static str, code: i32 },
}

pub type Result<T> = std::result::Result<T, RunnerError>;
