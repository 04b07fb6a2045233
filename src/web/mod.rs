//! Browser bindings: a web-sys projector, DOM key targets, the socket transport and `start`.

mod dom_projector;
mod key_target;
mod script;
mod socket;

pub use dom_projector::{load_node, DomProjector};
pub use key_target::{DocumentKeyHost, ElementKeyTarget};
pub use script::EvalScriptHost;
pub use socket::{window_socket_uri, WebSocketTransport};

use crate::{component::Services, config::Config, handler::MessageHandler, registry::ComponentRegistry, socket::Outbox};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

pub type WebHandler = MessageHandler<DomProjector>;

/// A running client. Dropping it disconnects the socket callbacks.
pub struct Client {
	handler: Rc<RefCell<WebHandler>>,
	transport: WebSocketTransport,
	_on_message: Closure<dyn FnMut(web_sys::MessageEvent)>,
	_on_close: Closure<dyn FnMut(web_sys::CloseEvent)>,
	_on_error: Closure<dyn FnMut(web_sys::ErrorEvent)>,
}

impl Client {
	#[must_use]
	pub fn handler(&self) -> &Rc<RefCell<WebHandler>> {
		&self.handler
	}

	#[must_use]
	pub fn transport(&self) -> &WebSocketTransport {
		&self.transport
	}
}

/// Installs `tracing-wasm`, connects to the page's cell socket and starts handling messages.
///
/// # Errors
///
/// If there is no window or document, or the socket can't be opened.
pub fn start(config: Config, registry: ComponentRegistry) -> Result<Client, JsValue> {
	if tracing_wasm::try_set_as_global_default().is_err() {
		trace!("a global tracing subscriber is already set");
	}

	let document = web_sys::window().and_then(|window| window.document()).ok_or_else(|| JsValue::from_str("no document"))?;
	let uri = window_socket_uri().ok_or_else(|| JsValue::from_str("no window location"))?;
	let transport = WebSocketTransport::connect(&uri)?;
	info!(%uri, "connecting");

	let services = Services {
		outbox: Outbox::new(Some(Rc::new(transport.clone()))),
		key_registry: Rc::default(),
		key_host: Rc::new(DocumentKeyHost::new(document.clone())),
		replies: Rc::default(),
		debounce_window: config.debounce_window(),
	};
	let handler = Rc::new(RefCell::new(
		MessageHandler::new(DomProjector::new(document), registry).with_config(config).with_services(services),
	));

	let on_message = {
		let handler = Rc::clone(&handler);
		Closure::wrap(Box::new(move |event: web_sys::MessageEvent| match event.data().as_string() {
			Some(text) => {
				if let Err(error) = handler.borrow_mut().handle_frame(&text, &mut EvalScriptHost) {
					error!("Failed to handle message: {}", error);
				}
			}
			None => trace!("ignoring binary packet"),
		}) as Box<dyn FnMut(web_sys::MessageEvent)>)
	};
	let on_close = {
		let handler = Rc::clone(&handler);
		Closure::wrap(Box::new(move |_: web_sys::CloseEvent| {
			if let Err(error) = handler.borrow_mut().show_connection_closed() {
				error!("Failed to show the disconnected view: {}", error);
			}
		}) as Box<dyn FnMut(web_sys::CloseEvent)>)
	};
	let on_error = Closure::wrap(Box::new(move |event: web_sys::ErrorEvent| error!("SOCKET ERROR: {}", event.message())) as Box<dyn FnMut(web_sys::ErrorEvent)>);

	let socket = transport.socket();
	socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
	socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
	socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

	Ok(Client {
		handler,
		transport,
		_on_message: on_message,
		_on_close: on_close,
		_on_error: on_error,
	})
}
