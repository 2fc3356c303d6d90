//! The exported frame dump and its optional manifest.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use panelfeed_common::{PanelfeedError, PanelfeedResult};
use panelfeed_panel_model::{
    dump_file_name, ColorParams, TrimWindow, FRAME_SIZE, PANEL_HEIGHT, PANEL_WIDTH,
};
use serde::{Deserialize, Serialize};

/// A finished export: `total_frames` panel frames back to back, no header.
#[derive(Clone, PartialEq)]
pub struct ExportArtifact {
    source_name: String,
    trim: TrimWindow,
    fps: u32,
    params: ColorParams,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for ExportArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportArtifact")
            .field("source_name", &self.source_name)
            .field("trim", &self.trim)
            .field("fps", &self.fps)
            .field("total_frames", &self.total_frames())
            .finish()
    }
}

/// Sidecar metadata written next to a dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub source: String,
    pub file: String,
    pub total_frames: u64,
    pub fps: u32,
    pub trim_start: f64,
    pub trim_end: f64,
    pub frame_size: usize,
    pub panel_width: u32,
    pub panel_height: u32,
    pub params: ColorParams,
    pub created_at: DateTime<Utc>,
}

impl ExportArtifact {
    pub(crate) fn new(
        source_name: String,
        trim: TrimWindow,
        fps: u32,
        params: ColorParams,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            source_name,
            trim,
            fps,
            params,
            bytes,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn trim(&self) -> TrimWindow {
        self.trim
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        (self.bytes.len() / FRAME_SIZE) as u64
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bytes of frame `index`, counted from the trim start.
    pub fn frame(&self, index: u64) -> Option<&[u8]> {
        let start = usize::try_from(index).ok()?.checked_mul(FRAME_SIZE)?;
        self.bytes.get(start..start + FRAME_SIZE)
    }

    /// `<base>_<start>s-<end>s.bin`.
    pub fn file_name(&self) -> String {
        dump_file_name(&self.source_name, &self.trim)
    }

    /// Write the dump into `dir` under [`file_name`](Self::file_name).
    pub fn write_to_dir(&self, dir: &Path) -> PanelfeedResult<PathBuf> {
        let path = dir.join(self.file_name());
        self.write_to(&path)?;
        Ok(path)
    }

    /// Write the dump to `path` atomically: the bytes go to a temporary file
    /// in the same directory which is renamed into place once complete.
    pub fn write_to(&self, path: &Path) -> PanelfeedResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&self.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PanelfeedError::Io(e.error))?;

        tracing::info!(
            path = %path.display(),
            bytes = self.bytes.len(),
            total_frames = self.total_frames(),
            "Wrote frame dump"
        );
        Ok(())
    }

    pub fn manifest(&self) -> ExportManifest {
        ExportManifest {
            source: self.source_name.clone(),
            file: self.file_name(),
            total_frames: self.total_frames(),
            fps: self.fps,
            trim_start: self.trim.start(),
            trim_end: self.trim.end(),
            frame_size: FRAME_SIZE,
            panel_width: PANEL_WIDTH,
            panel_height: PANEL_HEIGHT,
            params: self.params,
            created_at: Utc::now(),
        }
    }

    /// Write the manifest as pretty JSON next to `dump_path`
    /// (same name, `.json` extension).
    pub fn write_manifest(&self, dump_path: &Path) -> PanelfeedResult<PathBuf> {
        let path = dump_path.with_extension("json");
        let mut manifest = self.manifest();
        if let Some(name) = dump_path.file_name() {
            manifest.file = name.to_string_lossy().into_owned();
        }
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(frames: usize) -> ExportArtifact {
        ExportArtifact::new(
            "/videos/sunset.final.mp4".to_string(),
            TrimWindow::new(2.0, 4.0, 10.0),
            30,
            ColorParams::default(),
            (0..frames * FRAME_SIZE).map(|i| (i / FRAME_SIZE) as u8).collect(),
        )
    }

    #[test]
    fn test_file_name() {
        assert_eq!(artifact(1).file_name(), "sunset_2.0s-4.0s.bin");
    }

    #[test]
    fn test_frame_access() {
        let a = artifact(3);
        assert_eq!(a.total_frames(), 3);
        assert!(a.frame(1).unwrap().iter().all(|&b| b == 1));
        assert!(a.frame(3).is_none());
    }

    #[test]
    fn test_write_leaves_only_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(2);
        let path = a.write_to_dir(dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "sunset_2.0s-4.0s.bin");
        assert_eq!(std::fs::read(&path).unwrap(), a.as_bytes());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/custom.bin");
        artifact(1).write_to(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), FRAME_SIZE as u64);
    }

    #[test]
    fn test_manifest_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(2);
        let dump = a.write_to_dir(dir.path()).unwrap();
        let manifest_path = a.write_manifest(&dump).unwrap();

        assert_eq!(manifest_path.extension().unwrap(), "json");
        let manifest: ExportManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest.total_frames, 2);
        assert_eq!(manifest.frame_size, 11520);
        assert_eq!(manifest.file, "sunset_2.0s-4.0s.bin");
        assert_eq!(manifest.trim_start, 2.0);
        assert_eq!(manifest.source, "/videos/sunset.final.mp4");
    }
}
