use crate::{error::ScriptError, postscript::ScriptHost};

/// Runs postscripts with the global `eval`.
///
/// This executes arbitrary server-sent code with the page's full privileges.
#[derive(Debug, Default)]
pub struct EvalScriptHost;

impl ScriptHost for EvalScriptHost {
	fn run(&mut self, script: &str) -> Result<(), ScriptError> {
		js_sys::eval(script).map(drop).map_err(|error| ScriptError(format!("{:?}", error)))
	}
}
