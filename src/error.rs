//! Error types, one `enum` per concern.
//!
//! Protocol violations surface as [`HandlerError`] from [`MessageHandler::receive`](`crate::handler::MessageHandler::receive`).
//! Everything recoverable is logged where it happens instead.

use crate::cell_id::CellId;
use thiserror::Error;

/// Failures while constructing or rendering a single component.
#[derive(Debug, Error)]
pub enum ComponentError {
	#[error("You must define an id for every component props!")]
	MissingId,

	#[error("Cannot find Component for Cell Type: {0}")]
	UnknownCellType(String),

	#[error("You must implement a `build` method on Component objects! ({cell_type} [{id}])")]
	MissingBuild { cell_type: String, id: CellId },

	#[error("No live component with id {0}")]
	NotFound(CellId),
}

#[derive(Debug, Error)]
pub enum HandlerError {
	#[error("malformed {message_type} message: {source}")]
	Malformed {
		message_type: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("could not decode incoming frame: {0}")]
	Decode(#[from] serde_json::Error),

	#[error(transparent)]
	Component(#[from] ComponentError),

	#[error("named child reference {reference} (in {parent}) does not point at a live component")]
	DanglingReference { reference: CellId, parent: CellId },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
	#[error("Message missing Cell 'id'")]
	MissingCellId,

	#[error("Message missing 'message_id'")]
	MissingMessageId,

	#[error("Cell id {0} has no messages in the queue.")]
	EmptyQueue(CellId),

	#[error("Message {message_id} not found in queue for Cell {id}.")]
	UnknownMessage { id: CellId, message_id: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyRegistryError {
	#[error(
		"Listener with id {0} is already in the registry. \
		You are probably trying to add multiple listeners to the same component, which is not allowed."
	)]
	DuplicateListener(String),

	#[error("Found more than one listener for cell id {0}. Something is wrong!")]
	AmbiguousCellId(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectorError {
	#[error("no element with id {0:?} in the document")]
	ElementNotFound(String),

	#[error("cannot project an empty node over element {0:?}")]
	EmptyNode(String),

	#[error("DOM operation failed: {0}")]
	Dom(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("postscript failed: {0}")]
pub struct ScriptError(pub String);
