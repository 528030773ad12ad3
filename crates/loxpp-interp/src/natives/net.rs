// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! TCP natives. Every blocking operation runs on the worker pool and hands
//! back a task for the program to `await`.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::interp::{Interpreter, RuntimeDiagnostic, RuntimeError};
use crate::pool;
use crate::value::Value;

pub struct Socket {
    stream: Mutex<Option<TcpStream>>,
}

impl Socket {
    fn new(stream: TcpStream) -> Arc<Self> {
        Arc::new(Socket {
            stream: Mutex::new(Some(stream)),
        })
    }

    /// An independent handle to the stream, so no lock is held during I/O.
    fn handle(&self) -> Result<TcpStream, RuntimeError> {
        match self.stream.lock().as_ref() {
            Some(stream) => stream
                .try_clone()
                .map_err(|e| RuntimeError::Io(format!("Socket error: {e}"))),
            None => Err(RuntimeError::Io("Socket is closed.".to_string())),
        }
    }
}

pub struct Listener {
    inner: Mutex<Option<TcpListener>>,
    port: u16,
}

impl Listener {
    fn handle(&self) -> Result<TcpListener, RuntimeError> {
        match self.inner.lock().as_ref() {
            Some(listener) => listener
                .try_clone()
                .map_err(|e| RuntimeError::Io(format!("Listener error: {e}"))),
            None => Err(RuntimeError::Io("Listener is closed.".to_string())),
        }
    }
}

fn spawn_io<F>(interp: &mut Interpreter, op: &'static str, work: F) -> Result<Value, RuntimeDiagnostic>
where
    F: FnOnce() -> Result<Value, RuntimeError> + Send + 'static,
{
    let pool = interp.pool();
    tracing::debug!(op, "spawning network task");
    let handle = pool::spawn_task(&pool, move || work().map_err(RuntimeDiagnostic::from))?;
    Ok(Value::Task(handle))
}

fn socket_arg(name: &str, value: &Value) -> Result<Arc<Socket>, RuntimeError> {
    match value {
        Value::Socket(socket) => Ok(socket.clone()),
        _ => Err(RuntimeError::type_error(format!("'{name}' expects a socket."))),
    }
}

fn listener_arg(name: &str, value: &Value) -> Result<Arc<Listener>, RuntimeError> {
    match value {
        Value::Listener(listener) => Ok(listener.clone()),
        _ => Err(RuntimeError::type_error(format!("'{name}' expects a listener."))),
    }
}

fn port_arg(name: &str, value: &Value) -> Result<u16, RuntimeError> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && (0.0..=65535.0).contains(n) => Ok(*n as u16),
        _ => Err(RuntimeError::type_error(format!("'{name}' expects a port number."))),
    }
}

pub(crate) fn socket_connect(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let host = args[0]
        .as_string()
        .ok_or_else(|| RuntimeError::type_error("'socket_connect' expects a host string."))?;
    let port = port_arg("socket_connect", &args[1])?;
    spawn_io(interp, "connect", move || {
        let stream = TcpStream::connect((host.as_str(), port))
            .map_err(|e| RuntimeError::Io(format!("Failed to connect: {e}")))?;
        Ok(Value::Socket(Socket::new(stream)))
    })
}

pub(crate) fn socket_send(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let socket = socket_arg("socket_send", &args[0])?;
    let data = interp.stringify(&args[1])?;
    spawn_io(interp, "send", move || {
        socket
            .handle()?
            .write_all(data.as_bytes())
            .map_err(|e| RuntimeError::Io(format!("Failed to send data: {e}")))?;
        Ok(Value::Null)
    })
}

pub(crate) fn socket_receive(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let socket = socket_arg("socket_receive", &args[0])?;
    let size = match &args[1] {
        Value::Number(n) if *n >= 1.0 && n.fract() == 0.0 => *n as usize,
        _ => {
            return Err(RuntimeError::type_error(
                "'socket_receive' expects a positive buffer size.",
            )
            .into())
        }
    };
    spawn_io(interp, "receive", move || {
        let mut buffer = vec![0u8; size];
        let read = socket
            .handle()?
            .read(&mut buffer)
            .map_err(|e| RuntimeError::Io(format!("Failed to receive data: {e}")))?;
        Ok(Value::string(String::from_utf8_lossy(&buffer[..read])))
    })
}

pub(crate) fn socket_close(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let socket = socket_arg("socket_close", &args[0])?;
    spawn_io(interp, "close", move || {
        if let Some(stream) = socket.stream.lock().take() {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(Value::Null)
    })
}

pub(crate) fn server_listen(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let port = port_arg("server_listen", &args[0])?;
    spawn_io(interp, "listen", move || {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .map_err(|e| RuntimeError::Io(format!("Failed to bind server socket: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| RuntimeError::Io(format!("Failed to bind server socket: {e}")))?
            .port();
        Ok(Value::Listener(Arc::new(Listener {
            inner: Mutex::new(Some(listener)),
            port,
        })))
    })
}

pub(crate) fn server_port(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let listener = listener_arg("server_port", &args[0])?;
    Ok(Value::Number(f64::from(listener.port)))
}

pub(crate) fn server_accept(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let listener = listener_arg("server_accept", &args[0])?;
    spawn_io(interp, "accept", move || {
        let (stream, peer) = listener
            .handle()?
            .accept()
            .map_err(|e| RuntimeError::Io(format!("Failed to accept client connection: {e}")))?;
        tracing::trace!(%peer, "accepted connection");
        Ok(Value::Socket(Socket::new(stream)))
    })
}

pub(crate) fn server_close(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let listener = listener_arg("server_close", &args[0])?;
    spawn_io(interp, "close_server", move || {
        listener.inner.lock().take();
        Ok(Value::Null)
    })
}
