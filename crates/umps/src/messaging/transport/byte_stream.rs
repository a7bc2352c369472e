// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream and listener abstraction over TCP and Unix-domain sockets.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::os::unix::net::{UnixListener, UnixStream};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

use crate::error::{Error, Result};
use crate::messaging::transport::Endpoint;

/// A connected byte stream, TCP or Unix-domain.
#[derive(Debug)]
pub(crate) enum ByteStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl ByteStream {
    /// Connects to the endpoint.
    pub(crate) fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(_) => {
                let addr = endpoint.to_socket_addr()?;
                let stream = TcpStream::connect_timeout(&addr, timeout)
                    .map_err(|e| Error::TransportError(format!("connect {}: {}", endpoint, e)))?;
                configure_tcp(&stream);
                Ok(ByteStream::Tcp(stream))
            }
            Endpoint::Ipc(path) => {
                let stream = UnixStream::connect(path)
                    .map_err(|e| Error::TransportError(format!("connect {}: {}", endpoint, e)))?;
                Ok(ByteStream::Unix(stream))
            }
        }
    }

    /// A second handle to the same stream for the writer thread.
    pub(crate) fn try_clone(&self) -> Result<Self> {
        match self {
            ByteStream::Tcp(s) => Ok(ByteStream::Tcp(s.try_clone()?)),
            ByteStream::Unix(s) => Ok(ByteStream::Unix(s.try_clone()?)),
        }
    }

    /// Shuts the stream down in both directions, waking blocked readers.
    pub(crate) fn shutdown(&self) {
        match self {
            ByteStream::Tcp(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            ByteStream::Unix(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
        }
    }

    /// Bounds blocking reads; `None` restores indefinite blocking.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match self {
            ByteStream::Tcp(s) => s.set_read_timeout(timeout)?,
            ByteStream::Unix(s) => s.set_read_timeout(timeout)?,
        }
        Ok(())
    }

    /// The peer's IP address, or `"ipc"` for local sockets.
    pub(crate) fn peer_address(&self) -> String {
        match self {
            ByteStream::Tcp(s) => s
                .peer_addr()
                .map(|a| a.ip().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            ByteStream::Unix(_) => "ipc".to_string(),
        }
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ByteStream::Tcp(s) => s.read(buf),
            ByteStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            ByteStream::Tcp(s) => s.write(buf),
            ByteStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            ByteStream::Tcp(s) => s.flush(),
            ByteStream::Unix(s) => s.flush(),
        }
    }
}

/// A bound listener, TCP or Unix-domain.
///
/// Listeners are non-blocking so the accept loop can poll a stop flag;
/// `accept` returns `Ok(None)` when no peer is waiting.
#[derive(Debug)]
pub(crate) enum StreamListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl StreamListener {
    /// Binds the endpoint. A stale IPC socket file is removed first.
    pub(crate) fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(_) => {
                let addr = endpoint.to_socket_addr()?;
                let socket = socket2::Socket::new(
                    socket2::Domain::for_address(addr),
                    socket2::Type::STREAM,
                    None,
                )?;
                socket.set_reuse_address(true)?;
                socket
                    .bind(&addr.into())
                    .map_err(|e| Error::TransportError(format!("bind {}: {}", endpoint, e)))?;
                socket.listen(128)?;
                let listener: TcpListener = socket.into();
                listener.set_nonblocking(true)?;
                Ok(StreamListener::Tcp(listener))
            }
            Endpoint::Ipc(path) => {
                if path.exists() {
                    let _ = std::fs::remove_file(path);
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let listener = UnixListener::bind(path)
                    .map_err(|e| Error::TransportError(format!("bind {}: {}", endpoint, e)))?;
                listener.set_nonblocking(true)?;
                Ok(StreamListener::Unix(listener))
            }
        }
    }

    /// Accepts one waiting peer, if any.
    pub(crate) fn accept(&self) -> Result<Option<ByteStream>> {
        match self {
            StreamListener::Tcp(listener) => match listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false)?;
                    configure_tcp(&stream);
                    Ok(Some(ByteStream::Tcp(stream)))
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
                Err(e) => Err(Error::TransportError(format!("accept: {}", e))),
            },
            StreamListener::Unix(listener) => match listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false)?;
                    Ok(Some(ByteStream::Unix(stream)))
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
                Err(e) => Err(Error::TransportError(format!("accept: {}", e))),
            },
        }
    }
}

fn configure_tcp(stream: &TcpStream) {
    let sock = SockRef::from(stream);
    let _ = sock.set_nodelay(true);
    let _ = sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(Duration::from_secs(30)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_listener_accepts_connection() {
        #[allow(clippy::cast_possible_truncation)]
        let port = 49000 + (std::process::id() % 1000) as u16;
        let endpoint = Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        let listener = StreamListener::bind(&endpoint).expect("bind");
        assert!(listener.accept().expect("poll").is_none());

        let _client = ByteStream::connect(&endpoint, Duration::from_secs(1)).expect("connect");
        // Accept may need a few polls while the connection lands.
        let mut accepted = None;
        for _ in 0..100 {
            if let Some(stream) = listener.accept().expect("accept") {
                accepted = Some(stream);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        let accepted = accepted.expect("no connection accepted");
        assert!(!accepted.peer_address().is_empty());
    }

    #[test]
    fn ipc_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.ipc");
        let endpoint = Endpoint::Ipc(path);
        let listener = StreamListener::bind(&endpoint).expect("bind");

        let client = ByteStream::connect(&endpoint, Duration::from_secs(1)).expect("connect");
        assert_eq!(client.peer_address(), "ipc");

        let mut accepted = None;
        for _ in 0..100 {
            if let Some(stream) = listener.accept().expect("accept") {
                accepted = Some(stream);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(accepted.is_some());
    }
}
