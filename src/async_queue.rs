//! Per-cell ordering of asynchronous replies.
//!
//! Each cell announces the `message_id`s it expects with [`AsyncMessageQueue::enqueue`].
//! Replies arriving through [`AsyncMessageQueue::dequeue`] are released strictly in that order:
//! a reply for the head is released together with every cached reply contiguous behind it,
//! anything else waits in the cache.

use crate::{cell_id::CellId, error::QueueError};
use hashbrown::HashMap;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{instrument, trace};

#[derive(Debug)]
pub struct AsyncMessageQueue<M> {
	queue: HashMap<CellId, VecDeque<u64>>,
	cache: HashMap<CellId, HashMap<u64, M>>,
}

impl<M> Default for AsyncMessageQueue<M> {
	fn default() -> Self {
		Self {
			queue: HashMap::new(),
			cache: HashMap::new(),
		}
	}
}

impl<M> AsyncMessageQueue<M> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn enqueue(&mut self, id: CellId, message_id: u64) {
		self.queue.entry(id).or_default().push_back(message_id);
	}

	/// Pending `message_id`s for `id`, head first.
	#[must_use]
	pub fn pending(&self, id: &CellId) -> Vec<u64> {
		self.queue.get(id).map(|q| q.iter().copied().collect()).unwrap_or_default()
	}

	#[must_use]
	pub fn cached(&self, id: &CellId) -> usize {
		self.cache.get(id).map_or(0, HashMap::len)
	}

	/// Hands in the reply for `(id, message_id)` and returns every reply now ready, in order.
	///
	/// # Errors
	///
	/// [`QueueError::EmptyQueue`] if nothing is pending for `id`,
	/// [`QueueError::UnknownMessage`] if `message_id` isn't pending for it.
	#[instrument(skip(self, message))]
	pub fn dequeue(&mut self, id: &CellId, message_id: u64, message: M) -> Result<Vec<M>, QueueError> {
		let pending = match self.queue.get_mut(id) {
			Some(pending) if !pending.is_empty() => pending,
			_ => return Err(QueueError::EmptyQueue(id.clone())),
		};
		if !pending.contains(&message_id) {
			return Err(QueueError::UnknownMessage { id: id.clone(), message_id });
		}

		if pending.front() != Some(&message_id) {
			trace!("not at the head yet; caching");
			self.cache.entry(id.clone()).or_default().insert(message_id, message);
			return Ok(Vec::new());
		}

		pending.pop_front();
		let mut ready = vec![message];
		if let Some(cached) = self.cache.get_mut(id) {
			while let Some(&next) = pending.front() {
				match cached.remove(&next) {
					Some(message) => {
						pending.pop_front();
						ready.push(message);
					}
					None => break,
				}
			}
			if cached.is_empty() {
				self.cache.remove(id);
			}
		}
		if pending.is_empty() {
			self.queue.remove(id);
		}
		trace!(released = ready.len());
		Ok(ready)
	}
}

fn fields(message: &Value) -> Result<(CellId, u64), QueueError> {
	let id = message.get("id").and_then(CellId::from_value).ok_or(QueueError::MissingCellId)?;
	let message_id = message.get("message_id").and_then(Value::as_u64).ok_or(QueueError::MissingMessageId)?;
	Ok((id, message_id))
}

impl AsyncMessageQueue<Value> {
	/// Enqueues the `(id, message_id)` of a JSON message.
	///
	/// # Errors
	///
	/// If either field is missing.
	pub fn enqueue_message(&mut self, message: &Value) -> Result<(), QueueError> {
		let (id, message_id) = fields(message)?;
		self.enqueue(id, message_id);
		Ok(())
	}

	/// [`dequeue`](`AsyncMessageQueue::dequeue`) keyed by the message's own fields.
	///
	/// # Errors
	///
	/// If either field is missing, or as [`dequeue`](`AsyncMessageQueue::dequeue`).
	pub fn process_message(&mut self, message: Value) -> Result<Vec<Value>, QueueError> {
		let (id, message_id) = fields(&message)?;
		self.dequeue(&id, message_id, message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn queue_of_three() -> AsyncMessageQueue<Value> {
		let mut queue = AsyncMessageQueue::new();
		for message_id in 1..=3 {
			queue.enqueue_message(&json!({"id": "sheet", "message_id": message_id})).unwrap();
		}
		queue
	}

	#[test]
	fn out_of_order_reply_waits_for_the_head() {
		let mut queue = queue_of_three();
		let released = queue.process_message(json!({"id": "sheet", "message_id": 2, "payload": "b"})).unwrap();
		assert!(released.is_empty());
		assert_eq!(queue.cached(&"sheet".into()), 1);

		let released = queue.process_message(json!({"id": "sheet", "message_id": 1, "payload": "a"})).unwrap();
		let payloads: Vec<_> = released.iter().map(|m| m["payload"].clone()).collect();
		assert_eq!(payloads, vec![json!("a"), json!("b")]);
		assert_eq!(queue.pending(&"sheet".into()), vec![3]);
	}

	#[test]
	fn in_order_replies_release_one_by_one() {
		let mut queue = queue_of_three();
		let first = queue.process_message(json!({"id": "sheet", "message_id": 1})).unwrap();
		let second = queue.process_message(json!({"id": "sheet", "message_id": 2})).unwrap();
		assert_eq!(first[0]["message_id"], json!(1));
		assert_eq!(second[0]["message_id"], json!(2));
	}

	#[test]
	fn missing_fields_are_rejected() {
		let mut queue: AsyncMessageQueue<Value> = AsyncMessageQueue::new();
		assert_eq!(queue.enqueue_message(&json!({"message_id": 1})), Err(QueueError::MissingCellId));
		assert_eq!(queue.enqueue_message(&json!({"id": "x"})), Err(QueueError::MissingMessageId));
	}

	#[test]
	fn unknown_replies_are_errors() {
		let mut queue = queue_of_three();
		assert_eq!(queue.dequeue(&"other".into(), 1, Value::Null), Err(QueueError::EmptyQueue("other".into())));
		assert_eq!(
			queue.dequeue(&"sheet".into(), 9, Value::Null),
			Err(QueueError::UnknownMessage { id: "sheet".into(), message_id: 9 })
		);
	}
}
