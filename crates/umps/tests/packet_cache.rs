// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet cache end-to-end: broadcast -> capped collection -> query.

use std::time::{Duration, Instant};

use umps::message_formats::{downcast, DataPacket, Messages};
use umps::messaging::request_router::{Requestor, RequestorOptions};
use umps::messaging::router_dealer;
use umps::messaging::xpub_xsub;
use umps::messaging::Context;
use umps::proxy_broadcasts::data_packet;
use umps::proxy_services::packet_cache::{
    DataRequest, DataResponse, ReturnCode, SensorRequest, SensorResponse, Service, ServiceOptions,
};

fn packet(start_seconds: i64) -> DataPacket<f64> {
    let mut packet = DataPacket::<f64>::new();
    packet.set_network("UU").unwrap();
    packet.set_station("MOUT").unwrap();
    packet.set_channel("EHZ").unwrap();
    packet.set_location_code("01").unwrap();
    packet.set_sampling_rate(100.0).unwrap();
    packet.set_start_time_microseconds(start_seconds * 1_000_000);
    packet.set_samples(vec![0.5; 100]);
    packet
}

#[test]
fn range_query_over_ingested_packets() {
    let context = Context::new();
    let base = 33000 + fastrand::u16(0..10000);
    let broadcast_frontend = format!("tcp://127.0.0.1:{}", base);
    let broadcast_backend = format!("tcp://127.0.0.1:{}", base + 1);
    let cache_frontend = format!("tcp://127.0.0.1:{}", base + 2);
    let cache_backend = format!("tcp://127.0.0.1:{}", base + 3);

    // The data-packet broadcast.
    let broadcast = xpub_xsub::Proxy::new(&context);
    let mut broadcast_options = xpub_xsub::ProxyOptions::new();
    broadcast_options
        .set_frontend_address(&broadcast_frontend)
        .expect("frontend");
    broadcast_options
        .set_backend_address(&broadcast_backend)
        .expect("backend");
    broadcast.initialize(&broadcast_options).expect("broadcast init");
    broadcast.start().expect("broadcast start");

    // The query-side router/dealer proxy.
    let cache_proxy = router_dealer::Proxy::new(&context);
    let mut cache_proxy_options = router_dealer::ProxyOptions::new();
    cache_proxy_options
        .set_frontend_address(&cache_frontend)
        .expect("frontend");
    cache_proxy_options
        .set_backend_address(&cache_backend)
        .expect("backend");
    cache_proxy.initialize(&cache_proxy_options).expect("proxy init");
    cache_proxy.start().expect("proxy start");

    // The cache service between them.
    let mut service_options = ServiceOptions::new();
    service_options.set_max_packets(100).expect("max packets");
    service_options
        .set_data_broadcast_address(&broadcast_backend)
        .expect("broadcast address");
    service_options
        .set_replier_address(&cache_backend)
        .expect("replier address");
    let service = Service::<f64>::new(&context, &service_options).expect("service new");
    service.initialize(&service_options).expect("service init");
    service.start().expect("service start");

    // A producer feeding the broadcast.
    let mut producer = data_packet::Publisher::new(&context);
    producer
        .initialize(&broadcast_frontend, &umps::authentication::ZapOptions::new())
        .expect("producer init");
    std::thread::sleep(Duration::from_millis(1000));

    for start in 0..10 {
        producer.send(&packet(start)).expect("send packet");
    }

    // Wait for the ingest path to land all ten.
    let deadline = Instant::now() + Duration::from_secs(10);
    while service.total_number_of_packets() < 10 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(service.total_number_of_packets(), 10);

    // Query through the proxy.
    let mut formats = Messages::new();
    formats.add(Box::new(DataResponse::<f64>::new())).expect("register");
    formats.add(Box::new(SensorResponse::new())).expect("register");

    let mut client_options = RequestorOptions::new();
    client_options.set_address(&cache_frontend).expect("address");
    client_options.set_time_out(Some(Duration::from_secs(5)));
    client_options.set_message_formats(&formats).expect("formats");
    let mut client = Requestor::new(&context);
    client.initialize(&client_options).expect("client init");

    let mut request = DataRequest::new();
    request.set_sensor("UU", "MOUT", "EHZ", "01").expect("sensor");
    request.set_query_times_seconds(3.5, 6.2).expect("window");
    request.set_identifier(99);

    let reply = client.request(&request).expect("request").expect("timed out");
    let response = downcast::<DataResponse<f64>>(reply).expect("data response");
    assert_eq!(response.return_code(), ReturnCode::Success);
    assert_eq!(response.identifier(), 99);

    let starts: Vec<i64> = response
        .packets()
        .iter()
        .map(DataPacket::start_time_microseconds)
        .collect();
    assert_eq!(starts, vec![3_000_000, 4_000_000, 5_000_000, 6_000_000]);

    // Sensor enumeration through the same endpoint.
    let reply = client
        .request(&SensorRequest::new())
        .expect("request")
        .expect("timed out");
    let response = downcast::<SensorResponse>(reply).expect("sensor response");
    assert_eq!(response.sensors(), ["UU.MOUT.EHZ.01".to_string()]);

    service.stop();
    assert!(!service.is_running());
    cache_proxy.stop();
    broadcast.stop();
}
