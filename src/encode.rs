use crate::error::{ConvertError, ConvertResult};
use crate::probe::VideoMetadata;
use crate::progress::{ProgressReporter, Stage};
use crate::settings::ConversionSettings;
use crate::workspace::FRAME_PATTERN;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Mux the processed stereo frames into the output video.
///
/// Frames are scaled to the resolved target dimensions and encoded with
/// libx264 at the effective bitrate, yuv420p progressive, crf-biased rate
/// control.
pub async fn encode_video(
	processed_dir: &Path,
	settings: &ConversionSettings,
	output: &Path,
	progress: &mut ProgressReporter,
) -> ConvertResult<()> {
	if count_frames(processed_dir)? == 0 {
		return Err(ConvertError::Encode(
			"no processed frames found".to_string(),
		));
	}

	let (out_w, out_h) = settings.resolution.dimensions();
	let bitrate = settings.bitrate_arg();

	info!(
		resolution = settings.resolution.name(),
		bitrate = %bitrate,
		fps = settings.frame_rate,
		"encoding output video"
	);
	progress.report(Stage::Encoding, 0.0);

	let input_pattern = processed_dir.join(FRAME_PATTERN);
	let mut args: Vec<OsString> = Vec::new();
	args.push("-framerate".into());
	args.push(settings.frame_rate.to_string().into());
	args.push("-start_number".into());
	args.push("0".into());
	args.push("-i".into());
	args.push(input_pattern.into());
	args.push("-vf".into());
	args.push(format!("scale={}:{}", out_w, out_h).into());
	args.push("-c:v".into());
	args.push("libx264".into());
	args.push("-preset".into());
	args.push("medium".into());
	args.push("-crf".into());
	args.push("23".into());
	args.push("-b:v".into());
	args.push(bitrate.into());
	args.push("-pix_fmt".into());
	args.push("yuv420p".into());
	args.push("-y".into());
	args.push(output.into());

	run_ffmpeg(&args)
		.await
		.map_err(|stderr| ConvertError::Encode(format!("ffmpeg encode failed: {}", stderr)))?;

	progress.report(Stage::Encoding, 100.0);
	Ok(())
}

/// Pull a single thumbnail frame from the original, unconverted source at
/// 10% of its duration. Independent of the stereo pipeline.
pub async fn extract_thumbnail(
	source: &Path,
	metadata: &VideoMetadata,
	thumb_path: &Path,
) -> ConvertResult<()> {
	let seek = metadata.duration * 0.1;
	debug!(seek, "extracting thumbnail");

	let mut args: Vec<OsString> = Vec::new();
	args.push("-ss".into());
	args.push(format!("{:.3}", seek).into());
	args.push("-i".into());
	args.push(source.into());
	args.push("-vframes".into());
	args.push("1".into());
	args.push("-vf".into());
	args.push("scale=480:-2".into());
	args.push("-y".into());
	args.push(thumb_path.into());

	run_ffmpeg(&args)
		.await
		.map_err(|stderr| ConvertError::Encode(format!("thumbnail extraction failed: {}", stderr)))
}

async fn run_ffmpeg(args: &[OsString]) -> Result<(), String> {
	let output = Command::new("ffmpeg")
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::piped())
		.output()
		.await
		.map_err(|e| format!("failed to run ffmpeg: {}", e))?;

	if output.status.success() {
		Ok(())
	} else {
		Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
	}
}

fn count_frames(dir: &Path) -> ConvertResult<usize> {
	let mut count = 0;
	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		if entry.path().extension().and_then(|e| e.to_str()) == Some("png") {
			count += 1;
		}
	}
	Ok(count)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::progress::ProgressReporter;
	use crate::settings::ConversionSettings;

	#[test]
	fn empty_processed_dir_is_an_encode_error() {
		let dir = tempfile::tempdir().unwrap();
		let settings = ConversionSettings::default();
		let mut progress = ProgressReporter::new(None);

		let rt = tokio::runtime::Runtime::new().unwrap();
		let err = rt
			.block_on(encode_video(
				dir.path(),
				&settings,
				Path::new("/tmp/out.mp4"),
				&mut progress,
			))
			.unwrap_err();
		assert_eq!(err.kind(), "EncodeError");
	}

	#[test]
	fn counts_only_frame_images() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("frame_000000.png"), b"x").unwrap();
		std::fs::write(dir.path().join("frame_000001.png"), b"x").unwrap();
		std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
		assert_eq!(count_frames(dir.path()).unwrap(), 2);
	}
}
