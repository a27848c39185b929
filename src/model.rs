use crate::error::{ConvertError, ConvertResult};
use futures_util::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

const MIDAS_SMALL_URL: &str =
	"https://github.com/isl-org/MiDaS/releases/download/v2_1/model-small.onnx";

/// Map a depth-model identifier to its checkpoint file name.
///
/// Only MiDaS small is bundled today; the identifier is kept open-ended so
/// settings can name other models once their checkpoints are wired up.
pub fn model_filename(model_id: &str) -> ConvertResult<&'static str> {
	match model_id {
		"midas" | "midas-small" => Ok("midas-small.onnx"),
		other => Err(ConvertError::ModelInference(format!(
			"unknown depth model '{}'",
			other
		))),
	}
}

fn download_url(model_id: &str) -> ConvertResult<&'static str> {
	match model_id {
		"midas" | "midas-small" => Ok(MIDAS_SMALL_URL),
		other => Err(ConvertError::ModelInference(format!(
			"no download source for depth model '{}'",
			other
		))),
	}
}

/// Find the checkpoint for a model identifier.
///
/// Searches in order:
/// 1. VR180_MAKER_MODELS env var
/// 2. User's home directory ~/.vr180-maker/models/
/// 3. XDG data directory
/// 4. Current working directory ./models/
pub fn find_model(model_id: &str) -> ConvertResult<PathBuf> {
	let filename = model_filename(model_id)?;

	if let Ok(env_dir) = std::env::var("VR180_MAKER_MODELS") {
		let env_path = PathBuf::from(env_dir).join(filename);
		if env_path.exists() {
			return Ok(env_path);
		}
	}

	let search_paths = vec![
		dirs::home_dir()
			.unwrap_or_default()
			.join(".vr180-maker")
			.join("models")
			.join(filename),
		dirs::data_dir()
			.unwrap_or_default()
			.join("vr180-maker")
			.join("models")
			.join(filename),
		PathBuf::from("models").join(filename),
	];

	for path in &search_paths {
		if path.exists() {
			return Ok(path.clone());
		}
	}

	Err(ConvertError::ModelInference(format!(
		"checkpoint '{}' not found; searched:\n{}",
		filename,
		search_paths
			.iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)))
}

/// Ensure the model checkpoint exists locally, downloading it on first use.
/// Returns the checkpoint path. The optional callback receives
/// (downloaded_bytes, total_bytes).
pub async fn ensure_model<F: Fn(u64, u64)>(
	model_id: &str,
	progress: Option<F>,
) -> ConvertResult<PathBuf> {
	if let Ok(path) = find_model(model_id) {
		return Ok(path);
	}

	let filename = model_filename(model_id)?;
	let url = download_url(model_id)?;

	let dest_dir = dirs::home_dir()
		.unwrap_or_default()
		.join(".vr180-maker")
		.join("models");
	tokio::fs::create_dir_all(&dest_dir).await?;

	let dest = dest_dir.join(filename);
	let partial = dest_dir.join(format!("{}.part", filename));

	info!(model = model_id, url, "downloading depth model checkpoint");

	let response = reqwest::get(url)
		.await
		.map_err(|e| ConvertError::ModelInference(format!("model download failed: {}", e)))?
		.error_for_status()
		.map_err(|e| ConvertError::ModelInference(format!("model download failed: {}", e)))?;

	let total = response.content_length().unwrap_or(0);
	let mut downloaded = 0u64;

	let mut file = tokio::fs::File::create(&partial).await?;
	let mut stream = response.bytes_stream();

	while let Some(chunk) = stream.next().await {
		let chunk = chunk
			.map_err(|e| ConvertError::ModelInference(format!("model download failed: {}", e)))?;
		file.write_all(&chunk).await?;
		downloaded += chunk.len() as u64;
		if let Some(ref cb) = progress {
			cb(downloaded, total);
		}
	}
	file.flush().await?;
	drop(file);

	tokio::fs::rename(&partial, &dest).await?;
	info!(path = %dest.display(), "depth model checkpoint ready");

	Ok(dest)
}
