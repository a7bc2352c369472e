// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A live peer connection: writer thread, outbound queue, subscriptions.

use std::collections::HashSet;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::messaging::transport::byte_stream::ByteStream;
use crate::messaging::transport::frame_codec::write_parts;
use crate::messaging::transport::Frame;

/// One peer of a socket.
///
/// The outbound queue is bounded by the socket's send high-water mark;
/// publishers drop on a full queue, request-like sockets block up to
/// their send timeout. The reader side lives in the socket's session
/// loop; this type owns the writer half and the peer's subscription set.
pub(crate) struct Connection {
    pub(crate) id: u64,
    pub(crate) routing_id: Vec<u8>,
    pub(crate) peer_address: String,
    outbound_tx: Sender<Vec<Frame>>,
    stream: ByteStream,
    alive: Arc<AtomicBool>,
    subscriptions: Mutex<HashSet<Vec<u8>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Wraps an authenticated stream and starts its writer thread.
    pub(crate) fn spawn(
        id: u64,
        routing_id: Vec<u8>,
        stream: ByteStream,
        send_high_water_mark: usize,
    ) -> Result<Arc<Self>> {
        let peer_address = stream.peer_address();
        let writer_stream = stream.try_clone()?;
        let (outbound_tx, outbound_rx) = bounded(send_high_water_mark.max(1));
        let alive = Arc::new(AtomicBool::new(true));

        let connection = Arc::new(Self {
            id,
            routing_id,
            peer_address,
            outbound_tx,
            stream,
            alive: alive.clone(),
            subscriptions: Mutex::new(HashSet::new()),
            writer: Mutex::new(None),
        });

        let writer = std::thread::Builder::new()
            .name(format!("umps-writer-{}", id))
            .spawn(move || write_loop(writer_stream, &outbound_rx, &alive))
            .map_err(|e| Error::AlgorithmFailure(format!("spawn writer: {}", e)))?;
        *connection.writer.lock() = Some(writer);
        Ok(connection)
    }

    /// True until either side closed or errored.
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Queues a message, dropping it when the queue is full.
    ///
    /// Returns false when the message was dropped.
    pub(crate) fn try_send(&self, parts: Vec<Frame>) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.outbound_tx.try_send(parts) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queues a message, blocking up to `timeout` (`None` blocks
    /// indefinitely).
    pub(crate) fn send(&self, parts: Vec<Frame>, timeout: Option<Duration>) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::TransportError(format!(
                "connection to {} is closed",
                self.peer_address
            )));
        }
        match timeout {
            None => self
                .outbound_tx
                .send(parts)
                .map_err(|_| Error::TransportError("connection closed".into())),
            Some(timeout) => match self.outbound_tx.send_timeout(parts, timeout) {
                Ok(()) => Ok(()),
                Err(crossbeam::channel::SendTimeoutError::Timeout(_)) => Err(Error::Timeout),
                Err(crossbeam::channel::SendTimeoutError::Disconnected(_)) => {
                    Err(Error::TransportError("connection closed".into()))
                }
            },
        }
    }

    /// Records a topic-prefix subscription from this peer.
    pub(crate) fn subscribe(&self, topic: &[u8]) {
        self.subscriptions.lock().insert(topic.to_vec());
    }

    /// Removes a topic-prefix subscription.
    pub(crate) fn unsubscribe(&self, topic: &[u8]) {
        self.subscriptions.lock().remove(topic);
    }

    /// True when any subscribed prefix matches the topic.
    pub(crate) fn is_subscribed(&self, topic: &[u8]) -> bool {
        self.subscriptions
            .lock()
            .iter()
            .any(|prefix| topic.starts_with(prefix))
    }

    /// Closes the stream and joins the writer.
    pub(crate) fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.stream.shutdown();
        if let Some(writer) = self.writer.lock().take() {
            let _ = writer.join();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_loop(stream: ByteStream, outbound_rx: &Receiver<Vec<Frame>>, alive: &AtomicBool) {
    let mut writer = BufWriter::new(stream);
    loop {
        match outbound_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(parts) => {
                if let Err(e) = write_parts(&mut writer, &parts) {
                    log::debug!("[transport] write failed: {}", e);
                    alive.store(false, Ordering::SeqCst);
                    return;
                }
            }
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => {
                if !alive.load(Ordering::SeqCst) {
                    return;
                }
            }
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_prefix_matching() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conn.ipc");
        let endpoint = crate::messaging::transport::Endpoint::Ipc(path);
        let listener =
            crate::messaging::transport::byte_stream::StreamListener::bind(&endpoint).unwrap();
        let client = ByteStream::connect(&endpoint, Duration::from_secs(1)).unwrap();
        drop(listener);

        let connection = Connection::spawn(1, b"peer".to_vec(), client, 16).expect("spawn");
        connection.subscribe(b"UMPS::MessageFormats::Pick");
        assert!(connection.is_subscribed(b"UMPS::MessageFormats::Pick"));
        assert!(!connection.is_subscribed(b"UMPS::MessageFormats::Text"));

        connection.subscribe(b"");
        assert!(connection.is_subscribed(b"UMPS::MessageFormats::Text"));

        connection.unsubscribe(b"");
        connection.unsubscribe(b"UMPS::MessageFormats::Pick");
        assert!(!connection.is_subscribed(b"UMPS::MessageFormats::Pick"));
        connection.close();
    }
}
