//! Transport-facing plumbing: the outbound send seam and classification of inbound text frames.

use crate::{cell_id::CellId, message::Ack};
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, trace};

/// The socket as the client core sees it.
pub trait Transport {
	fn send_string(&self, text: &str);
}

/// Sends JSON messages over an optional [`Transport`].
///
/// Without a transport (headless use), messages are dropped.
#[derive(Clone, Default)]
pub struct Outbox {
	transport: Option<Rc<dyn Transport>>,
}

impl Outbox {
	#[must_use]
	pub fn new(transport: Option<Rc<dyn Transport>>) -> Self {
		Self { transport }
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.transport.is_some()
	}

	/// Serialises `message` and sends it verbatim.
	pub fn send<T: Serialize + ?Sized>(&self, message: &T) {
		let transport = match &self.transport {
			Some(transport) => transport,
			None => return trace!("no transport; dropping outbound message"),
		};
		match serde_json::to_string(message) {
			Ok(text) => transport.send_string(&text),
			Err(error) => error!("could not encode outbound message: {}", error),
		}
	}

	/// Stamps `target_cell` on an object message, then sends it.
	pub fn send_message_for(&self, mut message: Value, cell_id: &CellId) {
		if let Value::Object(fields) = &mut message {
			fields.insert("target_cell".to_owned(), Value::String(cell_id.to_string()));
		}
		self.send(&message);
	}
}

/// One inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
	/// `"postscripts"`: run the queued postscripts now.
	Postscripts,
	/// `"request_ack"`: the server waits for an [`Ack`] before sending more.
	RequestAck,
	Message(Value),
}

impl Frame {
	/// # Errors
	///
	/// If the frame is not valid JSON.
	pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
		Ok(match serde_json::from_str::<Value>(text)? {
			Value::String(s) if s == "postscripts" => Frame::Postscripts,
			Value::String(s) if s == "request_ack" => Frame::RequestAck,
			other => Frame::Message(other),
		})
	}
}

/// The cell socket address for a page location: same host, `/socket` prefixed to path and query.
#[must_use]
pub fn socket_uri(protocol: &str, host: &str, pathname: &str, search: &str) -> String {
	let scheme = if protocol == "https:" { "wss:" } else { "ws:" };
	format!("{}//{}/socket{}{}", scheme, host, pathname, search)
}

/// Counts acknowledged ack requests.
#[derive(Debug, Default)]
pub struct AckCounter {
	acked: u64,
}

impl AckCounter {
	pub fn next(&mut self) -> Ack {
		self.acked += 1;
		Ack { ack: self.acked }
	}
}
