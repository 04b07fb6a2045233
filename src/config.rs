use serde::Deserialize;
use web_time::Duration;

/// Runtime settings of a client.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Element the root cell is projected over, and replaced on disconnect.
	pub root_element_id: String,
	/// Prefix of the DOM id of every cell's element.
	pub element_id_prefix: String,
	/// Window for coalescing outgoing edits.
	pub debounce_ms: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			root_element_id: "page_root".to_owned(),
			element_id_prefix: "cell-".to_owned(),
			debounce_ms: 300,
		}
	}
}

impl Config {
	/// # Errors
	///
	/// If `json` is not a valid configuration object.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	#[must_use]
	pub fn debounce_window(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}
}
