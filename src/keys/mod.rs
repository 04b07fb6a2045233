//! Element-scoped keyboard shortcuts.
//!
//! A [`KeyBinding`] is one combination plus handler. A [`KeyListener`] attaches a single capturing
//! `keydown` listener to its [`KeyTarget`] and offers each event to its bindings in order.
//! Started listeners live in the [`KeyRegistry`], which holds at most one listener per id.

mod binding;
mod listener;
mod registry;

pub use binding::{KeyBinding, KeyCombo, KeyEvent, KeyHandler, KeyboardEvent, Modifier};
pub use listener::{KeyHost, KeyListener, KeyTarget, KeydownDispatch, MemoryKeyHost, MemoryKeyTarget};
pub use registry::KeyRegistry;
