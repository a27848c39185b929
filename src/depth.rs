use crate::error::ConvertResult;
use image::RgbImage;
use ndarray::Array2;

#[cfg(feature = "onnx")]
use crate::error::ConvertError;

/// Depth model behind a narrow seam so the pipeline can take test doubles
/// and per-worker instances. One estimator serves one pipeline invocation;
/// inference is serialized through `&mut self` because the underlying
/// session is not assumed re-entrant.
pub trait DepthEstimator: Send {
	/// Estimate a relative depth map for one frame. Output dimensions equal
	/// the input's, values are normalized to [0,1] with 1.0 = nearest and
	/// 0.0 = farthest (MiDaS emits inverse depth; the min-max normalization
	/// below fixes that convention for the whole run). A spatially constant
	/// map normalizes to all-zero.
	fn estimate(&mut self, frame: &RgbImage) -> ConvertResult<Array2<f32>>;
}

/// Min-max normalize raw model output into [0,1]. Degenerate maps
/// (max == min) become all-zero rather than dividing by zero.
pub(crate) fn normalize_depth(mut depth: Array2<f32>) -> Array2<f32> {
	let min = depth.iter().copied().fold(f32::INFINITY, f32::min);
	let max = depth.iter().copied().fold(f32::NEG_INFINITY, f32::max);
	let range = max - min;
	if range > 1e-6 {
		depth.mapv_inplace(|v| (v - min) / range);
	} else {
		depth.fill(0.0);
	}
	depth
}

/// Upsample the model's native output back to full frame resolution using
/// bicubic interpolation.
pub(crate) fn upsample_depth(
	data: &[f32],
	src_w: u32,
	src_h: u32,
	dst_w: u32,
	dst_h: u32,
) -> Array2<f32> {
	let depth_image = image::ImageBuffer::from_fn(src_w, src_h, |x, y| {
		image::Luma([data[(y * src_w + x) as usize]])
	});

	let resized = image::imageops::resize(
		&depth_image,
		dst_w,
		dst_h,
		image::imageops::FilterType::CatmullRom,
	);

	let data: Vec<f32> = resized.pixels().map(|p| p[0]).collect();
	Array2::from_shape_vec((dst_h as usize, dst_w as usize), data)
		.expect("resized buffer matches requested dimensions")
}

#[cfg(feature = "onnx")]
mod onnx {
	use super::*;
	use image::DynamicImage;
	use ort::session::{builder::GraphOptimizationLevel, Session};
	use std::path::Path;

	// MiDaS small expects a 256x256 ImageNet-normalized input.
	const INPUT_SIZE: u32 = 256;
	const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
	const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

	pub struct OnnxDepthEstimator {
		session: Session,
	}

	impl OnnxDepthEstimator {
		pub fn new(model_path: &Path) -> ConvertResult<Self> {
			let session = Session::builder()
				.map_err(|e| {
					ConvertError::ModelInference(format!("failed to create session: {}", e))
				})?
				.with_optimization_level(GraphOptimizationLevel::Level3)
				.map_err(|e| {
					ConvertError::ModelInference(format!("failed to set opt level: {}", e))
				})?
				.with_intra_threads(4)
				.map_err(|e| {
					ConvertError::ModelInference(format!("failed to set threads: {}", e))
				})?
				.commit_from_file(model_path)
				.map_err(|e| {
					ConvertError::ModelInference(format!(
						"failed to load model {}: {}",
						model_path.display(),
						e
					))
				})?;

			Ok(Self { session })
		}
	}

	impl DepthEstimator for OnnxDepthEstimator {
		fn estimate(&mut self, frame: &RgbImage) -> ConvertResult<Array2<f32>> {
			let (orig_width, orig_height) = frame.dimensions();
			let size = INPUT_SIZE as usize;

			let resized = DynamicImage::ImageRgb8(frame.clone()).resize_exact(
				INPUT_SIZE,
				INPUT_SIZE,
				image::imageops::FilterType::Lanczos3,
			);

			let rgb = resized.to_rgb8();
			let mut input_data = vec![0.0f32; 3 * size * size];

			for (i, pixel) in rgb.pixels().enumerate() {
				for c in 0..3 {
					let normalized =
						(pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
					input_data[c * size * size + i] = normalized;
				}
			}

			let input_value =
				ort::value::Value::from_array(([1usize, 3, size, size], input_data)).map_err(
					|e| ConvertError::ModelInference(format!("failed to create input: {}", e)),
				)?;

			let outputs = self.session.run(ort::inputs![input_value]).map_err(|e| {
				ConvertError::ModelInference(format!("inference failed: {}", e))
			})?;

			let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
				ConvertError::ModelInference(format!("failed to extract output: {}", e))
			})?;

			let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
			let h = dims[dims.len() - 2] as u32;
			let w = dims[dims.len() - 1] as u32;

			let full = upsample_depth(data, w, h, orig_width, orig_height);
			Ok(normalize_depth(full))
		}
	}
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxDepthEstimator;

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::Array2;

	#[test]
	fn normalization_spans_unit_interval() {
		let raw = Array2::from_shape_fn((4, 6), |(y, x)| (y * 6 + x) as f32 * 3.0 + 7.0);
		let norm = normalize_depth(raw);
		let min = norm.iter().copied().fold(f32::INFINITY, f32::min);
		let max = norm.iter().copied().fold(f32::NEG_INFINITY, f32::max);
		assert_eq!(min, 0.0);
		assert_eq!(max, 1.0);
		assert!(norm.iter().all(|v| v.is_finite()));
	}

	#[test]
	fn constant_map_normalizes_to_zero() {
		let raw = Array2::from_elem((8, 8), 42.5f32);
		let norm = normalize_depth(raw);
		assert!(norm.iter().all(|&v| v == 0.0));
	}

	#[test]
	fn upsample_matches_requested_dimensions() {
		let data = vec![0.0f32, 1.0, 0.5, 0.25];
		let up = upsample_depth(&data, 2, 2, 10, 6);
		assert_eq!(up.dim(), (6, 10));
	}
}
