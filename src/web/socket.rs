use crate::socket::{socket_uri, Transport};
use tracing::{error, trace};

/// A [`Transport`] over a browser `WebSocket`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
	socket: web_sys::WebSocket,
}

impl WebSocketTransport {
	/// # Errors
	///
	/// If the browser refuses to open the socket.
	pub fn connect(uri: &str) -> Result<Self, wasm_bindgen::JsValue> {
		let socket = web_sys::WebSocket::new(uri)?;
		socket.set_binary_type(web_sys::BinaryType::Arraybuffer);
		trace!(uri, "socket opened");
		Ok(Self { socket })
	}

	#[must_use]
	pub fn socket(&self) -> &web_sys::WebSocket {
		&self.socket
	}
}

impl Transport for WebSocketTransport {
	fn send_string(&self, text: &str) {
		if let Err(error) = self.socket.send_with_str(text) {
			error!("Failed to send over the socket: {:?}", error);
		}
	}
}

/// [`socket_uri`] for the current window, if there is one.
#[must_use]
pub fn window_socket_uri() -> Option<String> {
	let location = web_sys::window()?.location();
	Some(socket_uri(
		&location.protocol().ok()?,
		&location.host().ok()?,
		&location.pathname().ok()?,
		&location.search().ok()?,
	))
}
