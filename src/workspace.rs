use crate::error::{ConvertError, ConvertResult};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scoped temporary arena for one pipeline invocation. Holds the extracted
/// and processed frame directories; dropping it erases everything, on every
/// exit path. Never shared between concurrent invocations.
pub struct Workspace {
	root: TempDir,
	frames: PathBuf,
	processed: PathBuf,
}

impl Workspace {
	pub fn create() -> ConvertResult<Self> {
		let root = TempDir::with_prefix("vr180-maker-")
			.map_err(|e| ConvertError::Resource(format!("failed to create workspace: {}", e)))?;

		let frames = root.path().join("frames");
		let processed = root.path().join("processed");
		std::fs::create_dir(&frames)?;
		std::fs::create_dir(&processed)?;

		Ok(Self {
			root,
			frames,
			processed,
		})
	}

	pub fn path(&self) -> &Path {
		self.root.path()
	}

	/// Directory the extractor fills with source frames.
	pub fn frames_dir(&self) -> &Path {
		&self.frames
	}

	/// Directory the synthesizer fills with stereo frames.
	pub fn processed_dir(&self) -> &Path {
		&self.processed
	}
}

/// Workspace frame file name for a zero-based index. Fixed-width zero
/// padding keeps lexical and numeric ordering identical.
pub fn frame_filename(index: u64) -> String {
	format!("frame_{:06}.png", index)
}

/// The matching ffmpeg image2 input pattern.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn creates_frame_directories() {
		let ws = Workspace::create().unwrap();
		assert!(ws.frames_dir().is_dir());
		assert!(ws.processed_dir().is_dir());
	}

	#[test]
	fn drop_erases_everything() {
		let ws = Workspace::create().unwrap();
		let root = ws.path().to_path_buf();
		std::fs::write(ws.frames_dir().join(frame_filename(0)), b"data").unwrap();
		drop(ws);
		assert!(!root.exists());
	}

	#[test]
	fn zero_padding_keeps_lexical_order_numeric() {
		let mut names: Vec<String> = [0u64, 7, 99, 100, 1234, 100000]
			.iter()
			.map(|&i| frame_filename(i))
			.collect();
		let numeric = names.clone();
		names.sort();
		assert_eq!(names, numeric);
		assert_eq!(frame_filename(5), "frame_000005.png");
	}
}
