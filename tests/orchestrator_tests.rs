use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use sketch_runner::core::{BoardProfile, EventKind, OutputEvent, Peripheral};
use sketch_runner::error::{Result, RunnerError};
use sketch_runner::transport::{EventSink, SerialLink};
use sketch_runner::workspace::WorkspaceLayout;
use sketch_runner::{ArduinoRunner, SketchRunner};

/// Counts transport calls; boards without a touch reset must never use it.
struct CountingLink {
    calls: AtomicUsize,
}

impl CountingLink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SerialLink for CountingLink {
    async fn connect(&self, _path: &str, _baudrate: u32, _exclusive: bool) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> Result<Option<Vec<Peripheral>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Vec::new()))
    }
}

/// Serves a fixed peripheral list to the bootloader handshake.
struct FixedListLink {
    peripherals: Option<Vec<Peripheral>>,
}

#[async_trait]
impl SerialLink for FixedListLink {
    async fn connect(&self, _path: &str, _baudrate: u32, _exclusive: bool) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn list(&self) -> Result<Option<Vec<Peripheral>>> {
        Ok(self.peripherals.clone())
    }
}

struct CollectingSink {
    events: Mutex<Vec<OutputEvent>>,
}

impl CollectingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: OutputEvent) {
        self.events.lock().push(event);
    }
}

fn install_tool(path: &Path, script: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, script).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn workspace(temp: &TempDir, extensions: Option<PathBuf>) -> WorkspaceLayout {
    let layout = WorkspaceLayout::new(
        temp.path().join("ws"),
        temp.path().join("Arduino"),
        extensions,
    );
    fs::create_dir_all(layout.avrdude_conf().parent().unwrap()).unwrap();
    fs::write(layout.avrdude_conf(), "# avrdude.conf\n").unwrap();
    layout
}

/// A builder/programmer stand-in that records its arguments one per line,
/// prints canned output, and exits with the given code.
fn args_dumping_script(args_file: &Path, stdout_line: &str, stderr_line: &str, code: i32) -> String {
    format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > {}\necho \"{}\"\necho \"{}\" 1>&2\nexit {}\n",
        args_file.display(),
        stdout_line,
        stderr_line,
        code
    )
}

fn exiting_script(code: i32) -> String {
    format!("#!/bin/sh\nexit {}\n", code)
}

fn read_args(args_file: &Path) -> Vec<String> {
    fs::read_to_string(args_file)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn run_build_with_exit(code: i32) -> std::result::Result<(), RunnerError> {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    install_tool(&ws.builder_bin(), &exiting_script(code));

    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws,
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.build(b"void setup() {}\nvoid loop() {}\n").await
}

#[tokio::test]
async fn test_build_exit_codes_map_to_outcomes() {
    assert!(run_build_with_exit(0).await.is_ok());
    assert!(matches!(
        run_build_with_exit(1).await.unwrap_err(),
        RunnerError::BuildFailed
    ));
    assert!(matches!(
        run_build_with_exit(2).await.unwrap_err(),
        RunnerError::SketchNotFound
    ));
    assert!(matches!(
        run_build_with_exit(3).await.unwrap_err(),
        RunnerError::InvalidArguments
    ));
    assert!(matches!(
        run_build_with_exit(4).await.unwrap_err(),
        RunnerError::UnknownPreference
    ));
    assert!(matches!(
        run_build_with_exit(9).await.unwrap_err(),
        RunnerError::UnrecognizedExitCode {
            tool: "arduino-builder",
            code: 9
        }
    ));
}

#[tokio::test]
async fn test_build_success_regardless_of_stream_content() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("builder-args.txt");
    install_tool(
        &ws.builder_bin(),
        &args_dumping_script(
            &args_file,
            "Sketch uses 1084 bytes (3%) of program storage space.",
            "region text: error: something scary that did not fail the build",
            0,
        ),
    );

    let sink = CollectingSink::new();
    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        CountingLink::new(),
        sink.clone(),
    );
    runner.build(b"void setup() {}\n").await.unwrap();

    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| e.kind == EventKind::Banner && e.text.contains("Sketch uses")));
    assert!(events.iter().any(|e| e.kind == EventKind::Error));
}

#[tokio::test]
async fn test_build_writes_sketch_and_passes_fixed_arguments() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("builder-args.txt");
    install_tool(
        &ws.builder_bin(),
        &args_dumping_script(&args_file, "ok", "", 0),
    );

    let source = b"void setup() {}\nvoid loop() {}\n";
    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.build(source).await.unwrap();

    assert_eq!(fs::read(ws.sketch_path()).unwrap(), source);
    assert!(ws.build_dir().is_dir());
    assert!(ws.cache_dir().is_dir());

    let args = read_args(&args_file);
    assert_eq!(args[0], "-compile");
    assert_eq!(args[1], "-logger=human");
    assert!(args.contains(&"-warnings=none".to_string()));
    assert!(args.contains(&"-verbose".to_string()));
    assert!(args.contains(&"arduino:avr:uno".to_string()));
    assert_eq!(args.last().unwrap(), &ws.sketch_path().display().to_string());
    // No extension directory was configured, so no -libraries flag.
    assert!(!args.contains(&"-libraries".to_string()));
}

#[tokio::test]
async fn test_extension_libraries_follow_builtin_libraries() {
    let temp = TempDir::new().unwrap();
    let extensions = temp.path().join("extensions").join("libraries");
    fs::create_dir_all(&extensions).unwrap();

    let ws = workspace(&temp, Some(extensions.clone()));
    let args_file = temp.path().join("builder-args.txt");
    install_tool(
        &ws.builder_bin(),
        &args_dumping_script(&args_file, "ok", "", 0),
    );

    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.build(b"void setup() {}\n").await.unwrap();

    let args = read_args(&args_file);
    let builtin = args
        .iter()
        .position(|a| a == "-built-in-libraries")
        .unwrap();
    assert_eq!(args[builtin + 2], "-libraries");
    assert_eq!(args[builtin + 3], extensions.display().to_string());
}

#[tokio::test]
async fn test_build_missing_tool_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);

    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws,
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    let err = runner.build(b"void setup() {}\n").await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Spawn {
            tool: "arduino-builder",
            ..
        }
    ));
}

#[tokio::test]
async fn test_flash_plain_board_uses_supplied_port_and_skips_handshake() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("avrdude-args.txt");
    install_tool(
        &ws.avrdude_bin(),
        &args_dumping_script(&args_file, "", "avrdude done.  Thank you.", 0),
    );

    let link = CountingLink::new();
    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        link.clone(),
        CollectingSink::new(),
    );
    runner.flash(None).await.unwrap();

    assert_eq!(
        link.calls.load(Ordering::SeqCst),
        0,
        "no touch reset for boards outside the touch-reset list"
    );

    let args = read_args(&args_file);
    assert!(args.contains(&"-P/dev/ttyUSB0".to_string()));
    assert!(args.contains(&"-patmega328p".to_string()));
    assert!(args.contains(&"-carduino".to_string()));
    assert!(args.contains(&"-b115200".to_string()));
    assert!(args.contains(&"-D".to_string()));
    assert!(args.contains(&format!("-Uflash:w:{}:i", ws.artifact_path().display())));
}

#[tokio::test]
async fn test_flash_touch_board_targets_rediscovered_port() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("avrdude-args.txt");
    install_tool(
        &ws.avrdude_bin(),
        &args_dumping_script(&args_file, "", "avrdude done.", 0),
    );

    let link = Arc::new(FixedListLink {
        peripherals: Some(vec![Peripheral {
            path: "/dev/ttyACM9".to_string(),
            usb_identifier: "USB\\VID_2341&PID_0036\\5&1A2B3C4D".to_string(),
        }]),
    });
    let mut runner = ArduinoRunner::new(
        BoardProfile::leonardo(),
        ws,
        "/dev/ttyACM0",
        link,
        CollectingSink::new(),
    );
    runner.flash(None).await.unwrap();

    let args = read_args(&args_file);
    assert!(args.contains(&"-P/dev/ttyACM9".to_string()));
    assert!(args.contains(&"-patmega32u4".to_string()));
    assert!(args.contains(&"-cavr109".to_string()));
}

#[tokio::test]
async fn test_flash_aborts_when_handshake_fails() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("avrdude-args.txt");
    install_tool(
        &ws.avrdude_bin(),
        &args_dumping_script(&args_file, "", "", 0),
    );

    let link = Arc::new(FixedListLink {
        peripherals: Some(Vec::new()),
    });
    let mut runner = ArduinoRunner::new(
        BoardProfile::leonardo(),
        ws,
        "/dev/ttyACM0",
        link,
        CollectingSink::new(),
    );
    let err = runner.flash(None).await.unwrap_err();
    assert!(matches!(err, RunnerError::DeviceNotFound { .. }));
    assert!(
        !args_file.exists(),
        "the programmer must not run after a failed handshake"
    );
}

async fn run_flash_with_exit(code: i32) -> std::result::Result<(), RunnerError> {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    install_tool(&ws.avrdude_bin(), &exiting_script(code));

    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws,
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.flash(None).await
}

#[tokio::test]
async fn test_flash_exit_codes_map_to_outcomes() {
    assert!(run_flash_with_exit(0).await.is_ok());
    assert!(matches!(
        run_flash_with_exit(1).await.unwrap_err(),
        RunnerError::FlashFailed
    ));
    assert!(matches!(
        run_flash_with_exit(7).await.unwrap_err(),
        RunnerError::UnrecognizedExitCode {
            tool: "avrdude",
            code: 7
        }
    ));
}

#[tokio::test]
async fn test_flash_explicit_firmware_overrides_artifact() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("avrdude-args.txt");
    install_tool(
        &ws.avrdude_bin(),
        &args_dumping_script(&args_file, "", "", 0),
    );

    let firmware = temp.path().join("custom.hex");
    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.flash(Some(firmware.clone())).await.unwrap();

    let args = read_args(&args_file);
    assert!(args.contains(&format!("-Uflash:w:{}:i", firmware.display())));
    assert!(!args.contains(&format!("-Uflash:w:{}:i", ws.artifact_path().display())));
}

#[tokio::test]
async fn test_flash_realtime_firmware_resolves_from_table() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    let args_file = temp.path().join("avrdude-args.txt");
    install_tool(
        &ws.avrdude_bin(),
        &args_dumping_script(&args_file, "", "", 0),
    );

    let mut runner = ArduinoRunner::new(
        BoardProfile::uno(),
        ws.clone(),
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    runner.flash_realtime_firmware().await.unwrap();

    let args = read_args(&args_file);
    let expected = ws.firmware_path("realtime-uno.hex");
    assert!(args.contains(&format!("-Uflash:w:{}:i", expected.display())));
    assert!(
        !args.contains(&format!("-Uflash:w:{}:i", ws.artifact_path().display())),
        "realtime flashing never falls back to the build artifact"
    );
}

#[tokio::test]
async fn test_flash_realtime_firmware_unknown_board_fails() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(&temp, None);
    install_tool(&ws.avrdude_bin(), &exiting_script(0));

    let board = BoardProfile {
        fqbn: "vendor:avr:custom".to_string(),
        partno: "atmega328p".to_string(),
        programmer_id: "arduino".to_string(),
        baudrate: 115_200,
    };
    let mut runner = ArduinoRunner::new(
        board,
        ws,
        "/dev/ttyUSB0",
        CountingLink::new(),
        CollectingSink::new(),
    );
    let err = runner.flash_realtime_firmware().await.unwrap_err();
    assert!(matches!(err, RunnerError::NoRealtimeFirmware { .. }));
}
