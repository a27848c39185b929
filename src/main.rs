use clap::Parser;
use std::path::PathBuf;
use vr180_maker::{
	convert_video, ConversionSettings, Quality, Resolution, StereoLayout,
};

#[derive(Parser)]
#[command(name = "vr180-maker")]
#[command(about = "Convert 2D videos to stereoscopic VR180 using AI depth estimation")]
#[command(version)]
struct Cli {
	/// Input video file
	input: PathBuf,

	/// Output file (defaults to input path with -vr180 suffix)
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Output resolution: 720p, 1080p, 1440p, 4K (unknown values fall back to 1080p)
	#[arg(long, default_value = "1080p")]
	resolution: String,

	/// Quality tier: low, medium, high, ultra (unknown values fall back to medium)
	#[arg(long, default_value = "medium")]
	quality: String,

	/// Output frame rate
	#[arg(long, default_value = "30")]
	fps: u32,

	/// Stereo layout: side-by-side or top-bottom
	#[arg(long, default_value = "side-by-side")]
	layout: String,

	/// Explicit bitrate override in kbps (skips the quality formula)
	#[arg(long)]
	bitrate: Option<u32>,

	/// Depth model identifier
	#[arg(long, default_value = "midas")]
	model: String,
}

fn default_output(input: &PathBuf) -> PathBuf {
	let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
	let parent = input.parent().unwrap_or_else(|| std::path::Path::new("."));
	parent.join(format!("{}-vr180.mp4", stem))
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "vr180_maker=info".into()),
		)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.input));

	let settings = ConversionSettings {
		resolution: Resolution::parse(&cli.resolution),
		quality: Quality::parse(&cli.quality),
		frame_rate: cli.fps,
		bitrate_kbps: cli.bitrate,
		stereo_layout: StereoLayout::parse(&cli.layout),
		depth_model: cli.model.clone(),
	};

	eprintln!("Converting: {:?}", cli.input);
	eprintln!(
		"Resolution: {}, Quality: {}, Layout: {}",
		settings.resolution.name(),
		settings.quality.name(),
		settings.stereo_layout.name()
	);

	let start = std::time::Instant::now();

	let result = convert_video(
		&cli.input,
		&output,
		settings,
		Some(Box::new(|percent, stage| {
			eprint!("\r[{:>5.1}%] {}          ", percent, stage);
		})),
	)
	.await;

	eprintln!();

	if result.success {
		eprintln!("✓ Saved to: {:?}", output);
		if let Some(thumb) = result.thumbnail_path {
			eprintln!("✓ Thumbnail: {:?}", thumb);
		}
		if let Some(meta) = result.metadata {
			eprintln!(
				"Source: {}x{} @ {:.2} fps, {:.1}s, {}",
				meta.width, meta.height, meta.fps, meta.duration, meta.codec
			);
		}
		eprintln!("Total time: {:.1}s", start.elapsed().as_secs_f64());
	} else {
		eprintln!(
			"✗ Conversion failed ({}): {}",
			result.error_kind.as_deref().unwrap_or("unknown"),
			result.error.as_deref().unwrap_or("no details")
		);
		std::process::exit(1);
	}
}
