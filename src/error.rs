use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Pipeline error taxonomy. Every stage failure collapses into one of these
/// four kinds; the orchestrator reports the kind string alongside the message.
#[derive(Debug, Error)]
pub enum ConvertError {
	/// The source container could not be opened or a frame failed to decode.
	#[error("decode error: {0}")]
	Decode(String),

	/// The depth model could not be loaded or inference failed. Fatal for the
	/// whole run, never retried per frame.
	#[error("depth model error: {0}")]
	ModelInference(String),

	/// Output muxing/encoding failed, or there was nothing to encode.
	#[error("encode error: {0}")]
	Encode(String),

	/// Workspace allocation, disk, or missing-tool failure.
	#[error("resource error: {0}")]
	Resource(String),
}

impl ConvertError {
	/// Stable kind name carried in the failure result.
	pub fn kind(&self) -> &'static str {
		match self {
			ConvertError::Decode(_) => "DecodeError",
			ConvertError::ModelInference(_) => "ModelInferenceError",
			ConvertError::Encode(_) => "EncodeError",
			ConvertError::Resource(_) => "ResourceError",
		}
	}
}

impl From<std::io::Error> for ConvertError {
	fn from(e: std::io::Error) -> Self {
		ConvertError::Resource(e.to_string())
	}
}

impl From<image::ImageError> for ConvertError {
	fn from(e: image::ImageError) -> Self {
		ConvertError::Decode(e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_names_are_stable() {
		assert_eq!(ConvertError::Decode(String::new()).kind(), "DecodeError");
		assert_eq!(
			ConvertError::ModelInference(String::new()).kind(),
			"ModelInferenceError"
		);
		assert_eq!(ConvertError::Encode(String::new()).kind(), "EncodeError");
		assert_eq!(ConvertError::Resource(String::new()).kind(), "ResourceError");
	}

	#[test]
	fn io_errors_map_to_resource() {
		let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
		let err: ConvertError = io.into();
		assert_eq!(err.kind(), "ResourceError");
	}
}
