use crate::depth::DepthEstimator;
use crate::encode::{encode_video, extract_thumbnail};
use crate::error::{ConvertError, ConvertResult};
use crate::extract::extract_frames;
use crate::probe::{probe_video, VideoMetadata};
use crate::progress::{ProgressCallback, ProgressReporter, Stage};
use crate::settings::ConversionSettings;
use crate::stereo::synthesize;
use crate::workspace::Workspace;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Linear pipeline states; any state can transition to `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PipelineState {
	Start,
	FramesExtracted,
	FramesProcessed,
	VideoEncoded,
	MetadataCollected,
	Done,
	Failed,
}

/// Terminal value of one conversion: either the produced artifacts or a
/// failure kind + message. Never reports a partially written output as
/// success.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionResult {
	pub success: bool,
	pub output_path: Option<PathBuf>,
	pub thumbnail_path: Option<PathBuf>,
	pub metadata: Option<VideoMetadata>,
	pub error_kind: Option<String>,
	pub error: Option<String>,
}

impl ConversionResult {
	fn ok(output: PathBuf, thumbnail: PathBuf, metadata: VideoMetadata) -> Self {
		Self {
			success: true,
			output_path: Some(output),
			thumbnail_path: Some(thumbnail),
			metadata: Some(metadata),
			error_kind: None,
			error: None,
		}
	}

	pub(crate) fn failed(err: &ConvertError) -> Self {
		Self {
			success: false,
			output_path: None,
			thumbnail_path: None,
			metadata: None,
			error_kind: Some(err.kind().to_string()),
			error: Some(err.to_string()),
		}
	}
}

/// Sequences the stages over a scoped workspace and aggregates progress.
/// One pipeline owns one estimator instance; concurrent conversions must
/// each construct their own.
pub struct Pipeline<E: DepthEstimator> {
	estimator: E,
	settings: ConversionSettings,
}

impl<E: DepthEstimator> Pipeline<E> {
	pub fn new(estimator: E, settings: ConversionSettings) -> Self {
		Self {
			estimator,
			settings,
		}
	}

	/// Run the full conversion. The first failing stage aborts the run; the
	/// workspace is erased and any partial output removed before the failure
	/// result is returned.
	pub async fn run(
		&mut self,
		input: &Path,
		output: &Path,
		progress: Option<ProgressCallback>,
	) -> ConversionResult {
		let mut reporter = ProgressReporter::new(progress);

		match self.run_inner(input, output, &mut reporter).await {
			Ok((thumbnail, metadata)) => {
				reporter.complete();
				info!(output = %output.display(), "conversion finished");
				ConversionResult::ok(output.to_path_buf(), thumbnail, metadata)
			}
			Err(e) => {
				let state = PipelineState::Failed;
				error!(?state, kind = e.kind(), "conversion failed: {}", e);
				remove_partial(output);
				remove_partial(&thumbnail_path_for(output));
				ConversionResult::failed(&e)
			}
		}
	}

	async fn run_inner(
		&mut self,
		input: &Path,
		output: &Path,
		reporter: &mut ProgressReporter,
	) -> ConvertResult<(PathBuf, VideoMetadata)> {
		preflight()?;

		let mut state = PipelineState::Start;
		debug!(?state, input = %input.display(), "starting conversion");

		// One probe serves both the extractor geometry and the final
		// metadata; it reads the source directly, never the stereo output.
		let metadata = probe_video(input).await?;
		let workspace = Workspace::create()?;

		extract_frames(input, &metadata, workspace.frames_dir(), reporter).await?;
		state = PipelineState::FramesExtracted;
		debug!(?state);

		process_frames(
			workspace.frames_dir(),
			workspace.processed_dir(),
			&mut self.estimator,
			&self.settings,
			reporter,
		)?;
		state = PipelineState::FramesProcessed;
		debug!(?state);

		encode_video(workspace.processed_dir(), &self.settings, output, reporter).await?;
		state = PipelineState::VideoEncoded;
		debug!(?state);

		let thumbnail = thumbnail_path_for(output);
		extract_thumbnail(input, &metadata, &thumbnail).await?;
		state = PipelineState::MetadataCollected;
		debug!(?state);

		state = PipelineState::Done;
		debug!(?state);
		Ok((thumbnail, metadata))
		// workspace drops here, erasing all intermediates
	}
}

/// Per-frame stereo processing: estimate depth, synthesize the combined
/// stereo frame, write it under the same index. Each depth map is dropped
/// as soon as its stereo frame exists. A single frame's failure is fatal
/// for the whole conversion.
pub fn process_frames(
	frames_dir: &Path,
	processed_dir: &Path,
	estimator: &mut dyn DepthEstimator,
	settings: &ConversionSettings,
	progress: &mut ProgressReporter,
) -> ConvertResult<u64> {
	let mut frame_files: Vec<PathBuf> = std::fs::read_dir(frames_dir)?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
		.collect();
	// Zero-padded names make lexical order the presentation order.
	frame_files.sort();

	let total = frame_files.len() as u64;
	info!(frames = total, layout = settings.stereo_layout.name(), "processing frames");

	for (idx, frame_path) in frame_files.iter().enumerate() {
		let frame = image::open(frame_path)?.to_rgb8();
		let depth = estimator.estimate(&frame)?;
		let stereo = synthesize(&frame, &depth, settings.stereo_layout)?;

		let out_path = processed_dir.join(frame_path.file_name().unwrap_or_default());
		stereo.save(&out_path).map_err(|e| {
			ConvertError::Resource(format!("failed to write {}: {}", out_path.display(), e))
		})?;

		let local = (idx as u64 + 1) as f64 / total as f64 * 100.0;
		progress.report(Stage::Processing, local);
	}

	Ok(total)
}

/// Fail fast when required tools are absent instead of degrading later.
fn preflight() -> ConvertResult<()> {
	which::which("ffmpeg")
		.map_err(|_| ConvertError::Resource("ffmpeg not found in PATH".to_string()))?;
	which::which("ffprobe")
		.map_err(|_| ConvertError::Resource("ffprobe not found in PATH".to_string()))?;
	Ok(())
}

/// Thumbnail lives next to the output video so it survives workspace
/// teardown.
pub fn thumbnail_path_for(output: &Path) -> PathBuf {
	let stem = output
		.file_stem()
		.and_then(|s| s.to_str())
		.unwrap_or("output");
	output.with_file_name(format!("{}_thumb.jpg", stem))
}

fn remove_partial(path: &Path) {
	if path.exists() {
		if let Err(e) = std::fs::remove_file(path) {
			error!(path = %path.display(), "failed to remove partial output: {}", e);
		}
	}
}
