// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wiring: broadcast subscriber -> capped collection <- replier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::router_dealer::{Reply, ReplyOptions};
use crate::messaging::Context;
use crate::proxy_broadcasts::data_packet;
use crate::proxy_services::packet_cache::{
    CappedCollection, DataRequest, DataResponse, ReturnCode, SensorRequest, SensorResponse,
};

/// Packet-cache service configuration.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    max_packets: usize,
    data_broadcast_address: Option<String>,
    replier_address: Option<String>,
    subscriber_zap_options: ZapOptions,
    replier_zap_options: ZapOptions,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_packets: 300,
            data_broadcast_address: None,
            replier_address: None,
            subscriber_zap_options: ZapOptions::new(),
            replier_zap_options: ZapOptions::new(),
        }
    }
}

impl ServiceOptions {
    /// Defaults: 300 packets per sensor, Grasslands on both sockets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-sensor packet bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the bound is zero.
    pub fn set_max_packets(&mut self, max_packets: usize) -> Result<()> {
        if max_packets == 0 {
            return Err(Error::InvalidArgument(
                "max packets must be positive".into(),
            ));
        }
        self.max_packets = max_packets;
        Ok(())
    }

    /// The per-sensor packet bound.
    pub fn max_packets(&self) -> usize {
        self.max_packets
    }

    /// Sets the data-packet broadcast backend to ingest from.
    pub fn set_data_broadcast_address(&mut self, address: &str) -> Result<()> {
        crate::messaging::transport::Endpoint::parse(address)?;
        self.data_broadcast_address = Some(address.to_string());
        Ok(())
    }

    /// Sets the router/dealer backend the replier connects to.
    pub fn set_replier_address(&mut self, address: &str) -> Result<()> {
        crate::messaging::transport::Endpoint::parse(address)?;
        self.replier_address = Some(address.to_string());
        Ok(())
    }

    /// Sets the subscriber's authentication options.
    pub fn set_subscriber_zap_options(&mut self, zap_options: &ZapOptions) {
        self.subscriber_zap_options = zap_options.clone();
    }

    /// Sets the replier's authentication options.
    pub fn set_replier_zap_options(&mut self, zap_options: &ZapOptions) {
        self.replier_zap_options = zap_options.clone();
    }
}

/// The packet-cache service.
///
/// `start()` launches the ingest thread (broadcast subscriber into the
/// collection) and the replier answering [`DataRequest`] and
/// [`SensorRequest`]. Queries never block ingest beyond a ring's
/// reader-writer lock.
pub struct Service<T = f64>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    context: Context,
    collection: Arc<CappedCollection<T>>,
    subscriber: Mutex<Option<data_packet::Subscriber<T>>>,
    replier: Reply,
    ingest: Mutex<Option<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    running: AtomicBool,
}

impl<T> Service<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Creates an uninitialized service under the context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the packet bound is zero.
    pub fn new(context: &Context, options: &ServiceOptions) -> Result<Self> {
        Ok(Self {
            context: context.clone(),
            collection: Arc::new(CappedCollection::new(options.max_packets)?),
            subscriber: Mutex::new(None),
            replier: Reply::new(context),
            ingest: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
        })
    }

    /// Connects the subscriber and the replier.
    pub fn initialize(&self, options: &ServiceOptions) -> Result<()> {
        let broadcast_address = options
            .data_broadcast_address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("data broadcast address not set".into()))?;
        let replier_address = options
            .replier_address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("replier address not set".into()))?;

        let mut subscriber = data_packet::Subscriber::<T>::new(&self.context);
        subscriber.initialize(broadcast_address, &options.subscriber_zap_options)?;

        let collection = self.collection.clone();
        let mut reply_options = ReplyOptions::new();
        reply_options.set_address(replier_address)?;
        reply_options.set_zap_options(&options.replier_zap_options);
        reply_options.set_callback(Arc::new(move |message_type, payload| {
            answer(&collection, message_type, payload)
        }));
        self.replier.initialize(&reply_options)?;

        *self.subscriber.lock() = Some(subscriber);
        Ok(())
    }

    /// Starts the ingest thread and the replier.
    pub fn start(&self) -> Result<()> {
        let subscriber = self
            .subscriber
            .lock()
            .take()
            .ok_or_else(|| Error::NotInitialized("packet cache service".into()))?;
        self.replier.start()?;
        self.stop.store(false, Ordering::SeqCst);

        let collection = self.collection.clone();
        let stop = self.stop.clone();
        let ingest = std::thread::Builder::new()
            .name("umps-packetcache-ingest".to_string())
            .spawn(move || loop {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                match subscriber.receive(Some(Duration::from_millis(10))) {
                    Ok(Some(packet)) => {
                        if let Err(e) = collection.add_packet(&packet) {
                            log::warn!("[packet-cache] rejected inbound packet: {}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("[packet-cache] ingest failed: {}", e);
                        return;
                    }
                }
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn ingest: {}", e)))?;
        *self.ingest.lock() = Some(ingest);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// True while ingest and replier are up.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.replier.is_running()
    }

    /// Stops both tasks. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(ingest) = self.ingest.lock().take() {
            let _ = ingest.join();
        }
        self.replier.stop();
        self.running.store(false, Ordering::SeqCst);
    }

    /// The shared collection, for in-process queries.
    pub fn collection(&self) -> Arc<CappedCollection<T>> {
        self.collection.clone()
    }

    /// Total packets cached right now.
    pub fn total_number_of_packets(&self) -> usize {
        self.collection.total_packets()
    }
}

impl<T> Drop for Service<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// The replier callback: time-range and sensor queries.
fn answer<T>(
    collection: &CappedCollection<T>,
    message_type: &str,
    payload: &[u8],
) -> Result<Box<dyn Message>>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    let data_request_type = DataRequest::new();
    let sensor_request_type = SensorRequest::new();
    if message_type == data_request_type.message_type() {
        let mut request = data_request_type;
        let mut response = DataResponse::<T>::new();
        if request.from_bytes(payload).is_err() {
            response.set_return_code(ReturnCode::InvalidMessage);
            return Ok(Box::new(response));
        }
        response.set_identifier(request.identifier());
        if !collection.have_sensor(
            request.network(),
            request.station(),
            request.channel(),
            request.location_code(),
        ) {
            response.set_return_code(ReturnCode::NoSensor);
            return Ok(Box::new(response));
        }
        match collection.get_packets(
            request.network(),
            request.station(),
            request.channel(),
            request.location_code(),
            request.start_time_microseconds(),
            request.end_time_microseconds(),
        ) {
            Ok(packets) => response.set_packets(packets),
            Err(e) => {
                log::warn!("[packet-cache] query failed: {}", e);
                response.set_return_code(ReturnCode::AlgorithmFailure);
            }
        }
        return Ok(Box::new(response));
    }
    if message_type == sensor_request_type.message_type() {
        let mut request = sensor_request_type;
        let mut response = SensorResponse::new();
        if request.from_bytes(payload).is_err() {
            response.set_return_code(ReturnCode::InvalidMessage);
            return Ok(Box::new(response));
        }
        response.set_identifier(request.identifier());
        response.set_sensors(collection.sensor_names());
        return Ok(Box::new(response));
    }
    Err(Error::InvalidMessageType(message_type.to_string()))
}
