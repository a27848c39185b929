pub mod depth;
pub mod encode;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod settings;
pub mod stereo;
pub mod workspace;

pub use depth::DepthEstimator;
pub use error::{ConvertError, ConvertResult};
pub use pipeline::{ConversionResult, Pipeline};
pub use probe::VideoMetadata;
pub use progress::ProgressCallback;
pub use settings::{ConversionSettings, Quality, Resolution, StereoLayout};
pub use stereo::synthesize;

#[cfg(feature = "onnx")]
pub use depth::OnnxDepthEstimator;

use std::path::Path;

/// Convert a 2D video to stereoscopic VR180 with the default ONNX (MiDaS)
/// depth backend, downloading the checkpoint on first use. Library callers
/// that want a different backend construct a [`Pipeline`] with their own
/// [`DepthEstimator`].
#[cfg(feature = "onnx")]
pub async fn convert_video(
	input: &Path,
	output: &Path,
	settings: ConversionSettings,
	progress: Option<ProgressCallback>,
) -> ConversionResult {
	let model_path = match model::ensure_model::<fn(u64, u64)>(&settings.depth_model, None).await {
		Ok(path) => path,
		Err(e) => return ConversionResult::failed(&e),
	};

	let estimator = match OnnxDepthEstimator::new(&model_path) {
		Ok(est) => est,
		Err(e) => return ConversionResult::failed(&e),
	};

	Pipeline::new(estimator, settings).run(input, output, progress).await
}
