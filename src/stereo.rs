use crate::error::{ConvertError, ConvertResult};
use crate::settings::StereoLayout;
use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;

/// Maximum horizontal disparity: 5% of frame width. This fixed constant
/// controls stereo strength for the whole run.
pub fn max_disparity(width: u32) -> u32 {
	(width as f64 * 0.05).round() as u32
}

/// Synthesize one combined stereo frame from a source frame and its depth
/// map via a forward-splat disparity warp.
///
/// Per pixel, `shift = round(depth[y,x] * max_disparity)`; the right view
/// receives the source pixel at `x + shift`, the left at `x - shift`, both
/// skipped when out of bounds. Both views start as copies of the source, so
/// columns without an incoming write keep the undisplaced color. Iteration
/// is row-major, x ascending, last write wins; rows never interact, so the
/// per-row parallelism below produces bit-identical output to the
/// sequential loop. No occlusion handling or hole filling.
pub fn synthesize(
	frame: &RgbImage,
	depth: &Array2<f32>,
	layout: StereoLayout,
) -> ConvertResult<RgbImage> {
	let (width, height) = frame.dimensions();
	if depth.dim() != (height as usize, width as usize) {
		return Err(ConvertError::ModelInference(format!(
			"depth map is {:?}, frame is {}x{}",
			depth.dim(),
			width,
			height
		)));
	}

	let (left, right) = splat_views(frame, depth);
	Ok(combine(&left, &right, width, height, layout))
}

/// Displace pixels into raw left/right RGB buffers.
fn splat_views(frame: &RgbImage, depth: &Array2<f32>) -> (Vec<u8>, Vec<u8>) {
	let (width, height) = frame.dimensions();
	let w = width as usize;
	let row_bytes = w * 3;
	let src = frame.as_raw();
	let max_shift = max_disparity(width) as f32;

	let mut left = src.clone();
	let mut right = src.clone();

	left.par_chunks_mut(row_bytes)
		.zip(right.par_chunks_mut(row_bytes))
		.enumerate()
		.for_each(|(y, (left_row, right_row))| {
			let src_row = &src[y * row_bytes..(y + 1) * row_bytes];
			for x in 0..w {
				let shift = (depth[[y, x]] * max_shift).round() as i64;
				let px = &src_row[x * 3..x * 3 + 3];

				let xr = x as i64 + shift;
				if xr >= 0 && xr < w as i64 {
					let o = xr as usize * 3;
					right_row[o..o + 3].copy_from_slice(px);
				}

				let xl = x as i64 - shift;
				if xl >= 0 && xl < w as i64 {
					let o = xl as usize * 3;
					left_row[o..o + 3].copy_from_slice(px);
				}
			}
		});

	debug_assert_eq!(left.len(), (height as usize) * row_bytes);
	(left, right)
}

/// Pack the two views into one frame. Side-by-side doubles width (left then
/// right); top-bottom doubles height (left above right).
fn combine(left: &[u8], right: &[u8], width: u32, height: u32, layout: StereoLayout) -> RgbImage {
	let row_bytes = width as usize * 3;
	match layout {
		StereoLayout::SideBySide => {
			let mut out = Vec::with_capacity(left.len() + right.len());
			for y in 0..height as usize {
				out.extend_from_slice(&left[y * row_bytes..(y + 1) * row_bytes]);
				out.extend_from_slice(&right[y * row_bytes..(y + 1) * row_bytes]);
			}
			RgbImage::from_raw(width * 2, height, out)
				.expect("combined side-by-side buffer matches dimensions")
		}
		StereoLayout::TopBottom => {
			let mut out = Vec::with_capacity(left.len() + right.len());
			out.extend_from_slice(left);
			out.extend_from_slice(right);
			RgbImage::from_raw(width, height * 2, out)
				.expect("combined top-bottom buffer matches dimensions")
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgb;

	fn gradient_frame(width: u32, height: u32) -> RgbImage {
		RgbImage::from_fn(width, height, |x, y| {
			Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
		})
	}

	fn gradient_depth(width: u32, height: u32) -> Array2<f32> {
		Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
			((x + y) as f32) / ((width + height) as f32)
		})
	}

	#[test]
	fn five_percent_disparity_rounds() {
		assert_eq!(max_disparity(640), 32);
		assert_eq!(max_disparity(650), 33); // 32.5 rounds up, not truncates
		assert_eq!(max_disparity(1920), 96);
	}

	#[test]
	fn output_is_deterministic() {
		let frame = gradient_frame(64, 48);
		let depth = gradient_depth(64, 48);
		let a = synthesize(&frame, &depth, StereoLayout::SideBySide).unwrap();
		let b = synthesize(&frame, &depth, StereoLayout::SideBySide).unwrap();
		assert_eq!(a.as_raw(), b.as_raw());
	}

	#[test]
	fn side_by_side_doubles_width() {
		let frame = gradient_frame(64, 48);
		let depth = gradient_depth(64, 48);
		let out = synthesize(&frame, &depth, StereoLayout::SideBySide).unwrap();
		assert_eq!(out.dimensions(), (128, 48));
	}

	#[test]
	fn top_bottom_doubles_height() {
		let frame = gradient_frame(64, 48);
		let depth = gradient_depth(64, 48);
		let out = synthesize(&frame, &depth, StereoLayout::TopBottom).unwrap();
		assert_eq!(out.dimensions(), (64, 96));
	}

	#[test]
	fn zero_depth_is_identity_in_both_views() {
		let frame = gradient_frame(40, 8);
		let depth = Array2::zeros((8, 40));
		let out = synthesize(&frame, &depth, StereoLayout::SideBySide).unwrap();
		for y in 0..8 {
			for x in 0..40 {
				assert_eq!(out.get_pixel(x, y), frame.get_pixel(x, y));
				assert_eq!(out.get_pixel(40 + x, y), frame.get_pixel(x, y));
			}
		}
	}

	#[test]
	fn displacement_never_exceeds_max_disparity() {
		// One white pixel on black; full depth shifts it exactly max_shift.
		let width = 40u32; // max_disparity = 2
		let mut frame = RgbImage::from_pixel(width, 4, Rgb([0, 0, 0]));
		frame.put_pixel(10, 2, Rgb([255, 255, 255]));
		let depth = Array2::from_elem((4, width as usize), 1.0f32);

		let shift = max_disparity(width);
		assert_eq!(shift, 2);

		let (left, right) = splat_views(&frame, &depth);
		let idx = |x: u32, y: u32| (y as usize * width as usize + x as usize) * 3;

		assert_eq!(&right[idx(10 + shift, 2)..idx(10 + shift, 2) + 3], &[255, 255, 255]);
		assert_eq!(&left[idx(10 - shift, 2)..idx(10 - shift, 2) + 3], &[255, 255, 255]);
		// The white pixel moved; its origin was overwritten by a neighbor.
		assert_eq!(&right[idx(10, 2)..idx(10, 2) + 3], &[0, 0, 0]);
		// Nowhere further than max_shift is white.
		for x in 0..width {
			if x != 10 + shift {
				assert_ne!(&right[idx(x, 2)..idx(x, 2) + 3], &[255, 255, 255]);
			}
		}
	}

	#[test]
	fn later_writes_win_within_a_row() {
		// width 40 -> max_shift 2. In the left view, x=5 (shift 0) writes
		// column 5 first, then x=7 (shift 2) overwrites it.
		let width = 40u32;
		let frame = gradient_frame(width, 1);
		let mut depth = Array2::zeros((1, width as usize));
		depth[[0, 7]] = 1.0;

		let (left, _right) = splat_views(&frame, &depth);
		assert_eq!(&left[5 * 3..5 * 3 + 3], &frame.get_pixel(7, 0).0);
	}

	#[test]
	fn mismatched_depth_dimensions_are_rejected() {
		let frame = gradient_frame(32, 32);
		let depth = Array2::zeros((16, 16));
		let err = synthesize(&frame, &depth, StereoLayout::SideBySide).unwrap_err();
		assert_eq!(err.kind(), "ModelInferenceError");
	}
}
