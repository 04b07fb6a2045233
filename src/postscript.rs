//! Server-sent scripts run after a render pass.
//!
//! Running them is delegated to a [`ScriptHost`]. In the browser that host evaluates arbitrary
//! JavaScript, so only connect to servers you trust with script execution.

use crate::error::ScriptError;
use tracing::{error, info, trace};

pub trait ScriptHost {
	/// # Errors
	///
	/// Whatever the script raised.
	fn run(&mut self, script: &str) -> Result<(), ScriptError>;
}

/// Records scripts instead of running them.
#[derive(Debug, Default)]
pub struct RecordingScriptHost {
	pub ran: Vec<String>,
	/// Scripts equal to one of these fail.
	pub failing: Vec<String>,
}

impl ScriptHost for RecordingScriptHost {
	fn run(&mut self, script: &str) -> Result<(), ScriptError> {
		if self.failing.iter().any(|failing| failing == script) {
			return Err(ScriptError(format!("refusing {:?}", script)));
		}
		self.ran.push(script.to_owned());
		Ok(())
	}
}

/// Pending postscripts.
///
/// Drained newest first: the server prepends its postscripts in reverse, so this yields server order.
#[derive(Debug, Default)]
pub struct PostscriptQueue {
	postscripts: Vec<String>,
}

impl PostscriptQueue {
	pub fn push(&mut self, script: impl Into<String>) {
		self.postscripts.push(script.into());
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.postscripts.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.postscripts.is_empty()
	}

	pub fn clear(&mut self) {
		self.postscripts.clear();
	}

	/// Runs every queued script. A failing script is logged and skipped.
	///
	/// Returns how many scripts failed.
	pub fn drain_into(&mut self, host: &mut dyn ScriptHost) -> usize {
		let mut failures = 0;
		while let Some(postscript) = self.postscripts.pop() {
			match host.run(&postscript) {
				Ok(()) => trace!("ran postscript"),
				Err(err) => {
					failures += 1;
					error!("ERROR RUNNING POSTSCRIPT: {}", err);
					info!(postscript = %postscript, "offending postscript");
				}
			}
		}
		failures
	}
}
