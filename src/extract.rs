use crate::error::{ConvertError, ConvertResult};
use crate::probe::VideoMetadata;
use crate::progress::{ProgressReporter, Stage};
use crate::workspace::frame_filename;
use image::RgbImage;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Demux the source into ordered still frames at source frame rate.
///
/// ffmpeg decodes to raw rgb24 on stdout; each frame is written to the
/// workspace as `frame_{:06}.png` and referenced by index thereafter, so
/// the full sequence is never resident in memory. Returns the number of
/// frames extracted.
pub async fn extract_frames(
	input: &Path,
	metadata: &VideoMetadata,
	frames_dir: &Path,
	progress: &mut ProgressReporter,
) -> ConvertResult<u64> {
	let frame_size = (metadata.width * metadata.height * 3) as usize;

	info!(
		frames = metadata.frame_count,
		fps = metadata.fps,
		"extracting frames"
	);

	let mut child = Command::new("ffmpeg")
		.arg("-i")
		.arg(input)
		.args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-vsync", "0", "-"])
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|e| ConvertError::Resource(format!("failed to run ffmpeg: {}", e)))?;

	let mut stdout = child
		.stdout
		.take()
		.ok_or_else(|| ConvertError::Resource("ffmpeg stdout not captured".to_string()))?;
	let mut stderr = child
		.stderr
		.take()
		.ok_or_else(|| ConvertError::Resource("ffmpeg stderr not captured".to_string()))?;

	// Drain stderr concurrently so the decoder cannot block on a full pipe.
	let stderr_task = tokio::spawn(async move {
		let mut buf = String::new();
		let _ = stderr.read_to_string(&mut buf).await;
		buf
	});

	let mut frame_buffer = vec![0u8; frame_size];
	let mut count = 0u64;

	loop {
		match stdout.read_exact(&mut frame_buffer).await {
			Ok(_) => {
				write_frame(&frame_buffer, metadata, frames_dir, count)?;
				count += 1;

				if metadata.frame_count > 0 {
					let local = count as f64 / metadata.frame_count as f64 * 100.0;
					progress.report(Stage::Extracting, local);
				}
			}
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(e) => {
				let _ = child.kill().await;
				return Err(ConvertError::Decode(format!(
					"failed reading decoded frames: {}",
					e
				)));
			}
		}
	}

	let status = child
		.wait()
		.await
		.map_err(|e| ConvertError::Resource(format!("ffmpeg did not exit cleanly: {}", e)))?;
	let stderr_text = stderr_task.await.unwrap_or_default();

	if !status.success() {
		return Err(ConvertError::Decode(format!(
			"ffmpeg decode failed for {}: {}",
			input.display(),
			stderr_text.trim()
		)));
	}
	if count == 0 {
		return Err(ConvertError::Decode(format!(
			"no frames decoded from {}",
			input.display()
		)));
	}

	debug!(extracted = count, "frame extraction finished");
	Ok(count)
}

fn write_frame(
	data: &[u8],
	metadata: &VideoMetadata,
	frames_dir: &Path,
	index: u64,
) -> ConvertResult<()> {
	let frame = RgbImage::from_raw(metadata.width, metadata.height, data.to_vec()).ok_or_else(
		|| {
			ConvertError::Decode(format!(
				"decoded frame {} does not match {}x{}",
				index, metadata.width, metadata.height
			))
		},
	)?;

	let path = frames_dir.join(frame_filename(index));
	frame
		.save(&path)
		.map_err(|e| ConvertError::Resource(format!("failed to write {}: {}", path.display(), e)))
}
