//! Browser-side client for server-driven cell UIs.
//!
//! The server pushes cell descriptions over a websocket. A [`MessageHandler`] keeps one live
//! [`Instance`](`component::Instance`) per cell id, renders them into arena-allocated [`lignin`] nodes ([`vdom::Node`])
//! and hands those to a [`Projector`], which patches the document.
//! Interaction events travel back through the [`Outbox`](`socket::Outbox`).
//!
//! Everything outside [`web`] is target-independent and runs against [`MemoryDom`] in tests.

#![doc(html_root_url = "https://docs.rs/cells-dom/0.1.0")]
#![warn(clippy::pedantic)]

pub mod async_queue;
pub mod cell_id;
pub mod cells;
pub mod component;
pub mod config;
pub mod debounce;
pub mod error;
pub mod handler;
pub mod keys;
pub mod message;
pub mod postscript;
pub mod projector;
pub mod props;
pub mod registry;
pub mod socket;
pub mod style;
pub mod vdom;
pub mod widgets;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use cell_id::CellId;
pub use component::{CellContext, Component, RenderContext};
pub use config::Config;
pub use handler::MessageHandler;
pub use projector::{MemoryDom, Projector};
pub use registry::ComponentRegistry;
