use serde::{Deserialize, Serialize};

/// Output resolution presets. Unrecognized names fall back to 1080p.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
	#[serde(rename = "720p")]
	Hd720,
	#[default]
	#[serde(rename = "1080p")]
	Hd1080,
	#[serde(rename = "1440p")]
	Qhd1440,
	#[serde(rename = "4K", alias = "4k")]
	Uhd4k,
}

impl Resolution {
	/// Parse a resolution name, falling back to 1080p for anything unknown.
	pub fn parse(name: &str) -> Self {
		match name {
			"720p" => Resolution::Hd720,
			"1080p" => Resolution::Hd1080,
			"1440p" => Resolution::Qhd1440,
			"4K" | "4k" => Resolution::Uhd4k,
			_ => Resolution::Hd1080,
		}
	}

	/// Target pixel dimensions (width, height).
	pub fn dimensions(&self) -> (u32, u32) {
		match self {
			Resolution::Hd720 => (1280, 720),
			Resolution::Hd1080 => (1920, 1080),
			Resolution::Qhd1440 => (2560, 1440),
			Resolution::Uhd4k => (3840, 2160),
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Resolution::Hd720 => "720p",
			Resolution::Hd1080 => "1080p",
			Resolution::Qhd1440 => "1440p",
			Resolution::Uhd4k => "4K",
		}
	}
}

/// Quality tiers mapping to a base bitrate. Unrecognized names fall back
/// to medium.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
	Low,
	#[default]
	Medium,
	High,
	Ultra,
}

impl Quality {
	pub fn parse(name: &str) -> Self {
		match name {
			"low" => Quality::Low,
			"medium" => Quality::Medium,
			"high" => Quality::High,
			"ultra" => Quality::Ultra,
			_ => Quality::Medium,
		}
	}

	/// Base bitrate in kbps at the 1080p reference resolution.
	pub fn base_bitrate_kbps(&self) -> u32 {
		match self {
			Quality::Low => 1000,
			Quality::Medium => 2500,
			Quality::High => 5000,
			Quality::Ultra => 10000,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Quality::Low => "low",
			Quality::Medium => "medium",
			Quality::High => "high",
			Quality::Ultra => "ultra",
		}
	}
}

/// Spatial arrangement of the left/right views in one combined frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StereoLayout {
	#[default]
	#[serde(rename = "side-by-side")]
	SideBySide,
	#[serde(rename = "top-bottom")]
	TopBottom,
}

impl StereoLayout {
	pub fn parse(name: &str) -> Self {
		match name {
			"top-bottom" | "tab" | "tb" => StereoLayout::TopBottom,
			_ => StereoLayout::SideBySide,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			StereoLayout::SideBySide => "side-by-side",
			StereoLayout::TopBottom => "top-bottom",
		}
	}
}

/// Immutable per-job conversion configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionSettings {
	pub resolution: Resolution,
	pub quality: Quality,
	/// Output frame rate in frames per second.
	pub frame_rate: u32,
	/// Explicit bitrate override in kbps; wins over the quality formula.
	pub bitrate_kbps: Option<u32>,
	pub stereo_layout: StereoLayout,
	/// Depth model identifier, resolved by `model::find_model`.
	pub depth_model: String,
}

impl Default for ConversionSettings {
	fn default() -> Self {
		Self {
			resolution: Resolution::default(),
			quality: Quality::default(),
			frame_rate: 30,
			bitrate_kbps: None,
			stereo_layout: StereoLayout::default(),
			depth_model: "midas".to_string(),
		}
	}
}

impl ConversionSettings {
	/// Effective bitrate in kbps: the base bitrate for the quality tier
	/// scaled by output pixel count against a fixed 1080p baseline. The
	/// baseline stays 1920x1080 regardless of the requested resolution;
	/// that matches the behavior the encoder tables were tuned for.
	pub fn effective_bitrate_kbps(&self) -> u32 {
		if let Some(kbps) = self.bitrate_kbps {
			return kbps;
		}
		let (w, h) = self.resolution.dimensions();
		let factor = (w as f64 * h as f64) / (1920.0 * 1080.0);
		(self.quality.base_bitrate_kbps() as f64 * factor).round() as u32
	}

	/// Bitrate expressed the way ffmpeg expects it, e.g. "5000k".
	pub fn bitrate_arg(&self) -> String {
		format!("{}k", self.effective_bitrate_kbps())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolution_table() {
		assert_eq!(Resolution::Hd720.dimensions(), (1280, 720));
		assert_eq!(Resolution::Hd1080.dimensions(), (1920, 1080));
		assert_eq!(Resolution::Qhd1440.dimensions(), (2560, 1440));
		assert_eq!(Resolution::Uhd4k.dimensions(), (3840, 2160));
	}

	#[test]
	fn unknown_names_fall_back() {
		assert_eq!(Resolution::parse("8K"), Resolution::Hd1080);
		assert_eq!(Resolution::parse(""), Resolution::Hd1080);
		assert_eq!(Quality::parse("insane"), Quality::Medium);
	}

	#[test]
	fn bitrate_high_1080p_is_exactly_5000k() {
		let settings = ConversionSettings {
			resolution: Resolution::Hd1080,
			quality: Quality::High,
			..Default::default()
		};
		assert_eq!(settings.effective_bitrate_kbps(), 5000);
		assert_eq!(settings.bitrate_arg(), "5000k");
	}

	#[test]
	fn bitrate_low_4k_scales_off_1080p_baseline() {
		let settings = ConversionSettings {
			resolution: Resolution::Uhd4k,
			quality: Quality::Low,
			..Default::default()
		};
		// 1000 * (3840*2160)/(1920*1080) = 4000
		assert_eq!(settings.effective_bitrate_kbps(), 4000);
	}

	#[test]
	fn explicit_override_wins() {
		let settings = ConversionSettings {
			resolution: Resolution::Uhd4k,
			quality: Quality::Ultra,
			bitrate_kbps: Some(1234),
			..Default::default()
		};
		assert_eq!(settings.bitrate_arg(), "1234k");
	}

	#[test]
	fn layout_round_trips_through_serde() {
		let json = serde_json::to_string(&StereoLayout::SideBySide).unwrap();
		assert_eq!(json, "\"side-by-side\"");
		let back: StereoLayout = serde_json::from_str(&json).unwrap();
		assert_eq!(back, StereoLayout::SideBySide);
	}
}
