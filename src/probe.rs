use crate::error::{ConvertError, ConvertResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Technical metadata read straight from the source container. Collected
/// independently of the conversion; never derived from the stereo output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoMetadata {
	/// Duration in seconds.
	pub duration: f64,
	pub width: u32,
	pub height: u32,
	/// Frame rate evaluated from the container's rational representation.
	pub fps: f64,
	pub frame_count: u64,
	/// Container bitrate in bits per second.
	pub bitrate: u64,
	pub codec: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
	format: FfprobeFormat,
	streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
	duration: Option<String>,
	bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
	codec_type: String,
	codec_name: Option<String>,
	width: Option<u32>,
	height: Option<u32>,
	r_frame_rate: Option<String>,
	nb_frames: Option<String>,
	duration: Option<String>,
}

/// Probe a video file with ffprobe.
pub async fn probe_video(path: &Path) -> ConvertResult<VideoMetadata> {
	if !path.exists() {
		return Err(ConvertError::Decode(format!(
			"input file not found: {}",
			path.display()
		)));
	}

	let output = Command::new("ffprobe")
		.args([
			"-v",
			"error",
			"-print_format",
			"json",
			"-show_format",
			"-show_streams",
		])
		.arg(path)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.output()
		.await
		.map_err(|e| ConvertError::Resource(format!("failed to run ffprobe: {}", e)))?;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		return Err(ConvertError::Decode(format!(
			"ffprobe failed for {}: {}",
			path.display(),
			stderr.trim()
		)));
	}

	let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
		.map_err(|e| ConvertError::Decode(format!("unparseable ffprobe output: {}", e)))?;

	let stream = probe
		.streams
		.iter()
		.find(|s| s.codec_type == "video")
		.ok_or_else(|| ConvertError::Decode("no video stream found".to_string()))?;

	let width = stream
		.width
		.ok_or_else(|| ConvertError::Decode("stream reports no width".to_string()))?;
	let height = stream
		.height
		.ok_or_else(|| ConvertError::Decode("stream reports no height".to_string()))?;

	let fps = stream
		.r_frame_rate
		.as_deref()
		.and_then(parse_frame_rate)
		.unwrap_or(30.0);

	let duration = stream
		.duration
		.as_deref()
		.and_then(|s| s.parse::<f64>().ok())
		.or_else(|| {
			probe
				.format
				.duration
				.as_deref()
				.and_then(|s| s.parse::<f64>().ok())
		})
		.unwrap_or(0.0);

	let frame_count = stream
		.nb_frames
		.as_deref()
		.and_then(|s| s.parse::<u64>().ok())
		.unwrap_or_else(|| (duration * fps).round() as u64);

	let bitrate = probe
		.format
		.bit_rate
		.as_deref()
		.and_then(|s| s.parse::<u64>().ok())
		.unwrap_or(0);

	Ok(VideoMetadata {
		duration,
		width,
		height,
		fps,
		frame_count,
		bitrate,
		codec: stream.codec_name.clone().unwrap_or_default(),
	})
}

/// Parse a rational frame rate like "30000/1001", or a plain "29.97".
fn parse_frame_rate(s: &str) -> Option<f64> {
	if let Some((num, den)) = s.split_once('/') {
		let num: f64 = num.parse().ok()?;
		let den: f64 = den.parse().ok()?;
		if den > 0.0 {
			return Some(num / den);
		}
		return None;
	}
	s.parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_rational_frame_rates() {
		assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 1e-9);
		assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
		assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 1e-9);
		assert_eq!(parse_frame_rate("30/0"), None);
		assert_eq!(parse_frame_rate("nonsense"), None);
	}

	#[test]
	fn missing_file_is_a_decode_error() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		let err = rt
			.block_on(probe_video(Path::new("/nonexistent/clip.mp4")))
			.unwrap_err();
		assert_eq!(err.kind(), "DecodeError");
	}

	#[test]
	fn deserializes_ffprobe_json() {
		let json = r#"{
			"format": {"duration": "12.5", "bit_rate": "800000"},
			"streams": [{
				"codec_type": "video",
				"codec_name": "h264",
				"width": 640,
				"height": 360,
				"r_frame_rate": "30000/1001",
				"nb_frames": "374"
			}]
		}"#;
		let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
		assert_eq!(probe.streams[0].codec_name.as_deref(), Some("h264"));
		assert_eq!(probe.format.duration.as_deref(), Some("12.5"));
	}
}
