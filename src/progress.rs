/// Progress subscriber: receives `(percentage 0-100, stage label)`.
/// Updates may be coalesced; values are never allowed to go backwards.
pub type ProgressCallback = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Pipeline stage, with its reserved slice of the global 0-100 range.
/// Extraction gets the first 20%, per-frame processing the middle 60%,
/// encoding the final 20%.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	Extracting,
	Processing,
	Encoding,
}

impl Stage {
	pub fn label(&self) -> &'static str {
		match self {
			Stage::Extracting => "extracting frames",
			Stage::Processing => "processing frames",
			Stage::Encoding => "encoding video",
		}
	}

	/// Global (start, end) percentage span for this stage.
	pub fn span(&self) -> (f64, f64) {
		match self {
			Stage::Extracting => (0.0, 20.0),
			Stage::Processing => (20.0, 80.0),
			Stage::Encoding => (80.0, 100.0),
		}
	}

	/// Remap a stage-local 0-100 into the stage's global sub-range.
	pub fn global_percent(&self, local: f64) -> f64 {
		let (start, end) = self.span();
		start + (end - start) * (local.clamp(0.0, 100.0) / 100.0)
	}
}

/// Aggregates stage-local progress into one monotonic percentage.
pub struct ProgressReporter {
	callback: Option<ProgressCallback>,
	high_water: f64,
}

impl ProgressReporter {
	pub fn new(callback: Option<ProgressCallback>) -> Self {
		Self {
			callback,
			high_water: 0.0,
		}
	}

	/// Report stage-local progress (0-100 within the stage).
	pub fn report(&mut self, stage: Stage, local: f64) {
		self.emit(stage.global_percent(local), stage.label());
	}

	/// Report the terminal 100% on success.
	pub fn complete(&mut self) {
		self.emit(100.0, "complete");
	}

	fn emit(&mut self, percent: f64, label: &str) {
		// Monotonic: a late or coarse stage update never moves backwards.
		let percent = percent.max(self.high_water);
		self.high_water = percent;
		if let Some(ref cb) = self.callback {
			cb(percent, label);
		}
	}
}
