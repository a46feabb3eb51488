//! Fixed path schema the build and flash operations read and write within.
//!
//! Layout relative to the workspace root:
//! `project/arduino.ino`, `project/build/` (default artifact
//! `arduino.ino.hex`), `project/cache/`. The tool installation lives under
//! its own root: `arduino-builder`, `hardware/`, `tools-builder/`,
//! `libraries/`, `hardware/tools/avr/{bin/avrdude,etc/avrdude.conf}`, and
//! `firmware/` holding prebuilt realtime images.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::Result;

pub const SKETCH_FILE: &str = "arduino.ino";
pub const DEFAULT_ARTIFACT: &str = "arduino.ino.hex";

#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
    arduino_dir: PathBuf,
    /// Libraries contributed by installed extensions, if any. The directory
    /// may legitimately not exist.
    extension_libraries: Option<PathBuf>,
}

impl WorkspaceLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        arduino_dir: impl Into<PathBuf>,
        extension_libraries: Option<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            arduino_dir: arduino_dir.into(),
            extension_libraries,
        }
    }

    pub fn sketch_path(&self) -> PathBuf {
        self.root.join("project").join(SKETCH_FILE)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("project").join("build")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("project").join("cache")
    }

    /// Artifact the build tool leaves behind and the default flash input.
    pub fn artifact_path(&self) -> PathBuf {
        self.build_dir().join(DEFAULT_ARTIFACT)
    }

    pub fn builder_bin(&self) -> PathBuf {
        self.arduino_dir.join("arduino-builder")
    }

    pub fn hardware_dir(&self) -> PathBuf {
        self.arduino_dir.join("hardware")
    }

    pub fn tools_builder_dir(&self) -> PathBuf {
        self.arduino_dir.join("tools-builder")
    }

    pub fn avr_tools_dir(&self) -> PathBuf {
        self.arduino_dir.join("hardware").join("tools").join("avr")
    }

    pub fn builtin_libraries_dir(&self) -> PathBuf {
        self.arduino_dir.join("libraries")
    }

    pub fn extension_libraries_dir(&self) -> Option<&Path> {
        self.extension_libraries.as_deref()
    }

    pub fn avrdude_bin(&self) -> PathBuf {
        self.avr_tools_dir().join("bin").join("avrdude")
    }

    pub fn avrdude_conf(&self) -> PathBuf {
        self.avr_tools_dir().join("etc").join("avrdude.conf")
    }

    pub fn firmware_path(&self, file: &str) -> PathBuf {
        self.arduino_dir.join("firmware").join(file)
    }

    /// Create the build output and cache directories.
    pub async fn ensure_build_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.build_dir()).await?;
        fs::create_dir_all(self.cache_dir()).await?;
        Ok(())
    }

    /// Write the sketch payload to the fixed source path. Text encoding of
    /// the payload happens upstream; the bytes land on disk as given. The
    /// write must complete before the build tool is spawned.
    pub async fn write_sketch(&self, source: &[u8]) -> Result<()> {
        let path = self.sketch_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, source).await?;
        debug!(path = %path.display(), bytes = source.len(), "sketch written");
        Ok(())
    }
}
