// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery and incrementer services end-to-end.

use std::time::Duration;

use umps::authentication::{SecurityLevel, UserPrivileges};
use umps::messaging::{ConnectOrBind, Context};
use umps::services::connection_information::{
    ConnectionDetails, Requestor, RequestorOptions, Service, ServiceOptions, SocketKind,
};
use umps::services::incrementer;

#[test]
fn connection_information_round_trip() {
    let context = Context::new();
    let address = format!("tcp://127.0.0.1:{}", 36000 + fastrand::u16(0..5000));

    let service = Service::new(&context);
    let mut options = ServiceOptions::new();
    options.set_address(&address).expect("address");
    service.initialize(&options).expect("service init");
    service.start().expect("service start");

    // Components publish themselves on start.
    service.insert(
        ConnectionDetails::new(
            "DataPacketBroadcast",
            SocketKind::XSubscriber,
            "tcp://127.0.0.1:5550",
            SecurityLevel::Grasslands,
            ConnectOrBind::Connect,
            UserPrivileges::ReadOnly,
        )
        .expect("details"),
    );
    service.insert(
        ConnectionDetails::new(
            "PacketCache",
            SocketKind::Router,
            "tcp://127.0.0.1:5552",
            SecurityLevel::Grasslands,
            ConnectOrBind::Connect,
            UserPrivileges::ReadOnly,
        )
        .expect("details"),
    );

    let mut requestor_options = RequestorOptions::new();
    requestor_options.set_address(&address).expect("address");
    requestor_options.set_time_out(Some(Duration::from_secs(5)));
    let mut requestor = Requestor::new(&context);
    requestor.initialize(&requestor_options).expect("requestor init");

    let all = requestor.get_all_connection_details().expect("listing");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name(), "DataPacketBroadcast");
    assert_eq!(all[1].name(), "PacketCache");

    let cache = requestor
        .get_connection_details("PacketCache")
        .expect("lookup");
    assert_eq!(cache.address(), "tcp://127.0.0.1:5552");

    // Withdrawn on stop.
    service.remove("PacketCache");
    let all = requestor.get_all_connection_details().expect("listing");
    assert_eq!(all.len(), 1);

    service.stop();
    assert!(!service.is_running());
}

#[test]
fn incrementer_hands_out_unique_identifiers() {
    let context = Context::new();
    let address = format!("tcp://127.0.0.1:{}", 36000 + fastrand::u16(0..5000));

    let service = incrementer::Service::new(&context);
    let mut options = incrementer::ServiceOptions::new();
    options.set_address(&address).expect("address");
    options.set_initial_value(1);
    service.initialize(&options).expect("service init");
    service.start().expect("service start");

    let mut requestor_options = incrementer::RequestorOptions::new();
    requestor_options.set_address(&address).expect("address");
    requestor_options.set_time_out(Some(Duration::from_secs(5)));
    let mut requestor = incrementer::Requestor::new(&context);
    requestor.initialize(&requestor_options).expect("requestor init");

    let first = requestor.next_value("Pick").expect("draw");
    let second = requestor.next_value("Pick").expect("draw");
    let other = requestor.next_value("Event").expect("draw");
    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(other, 1);

    let items = requestor.items().expect("items");
    assert_eq!(items, vec!["Event".to_string(), "Pick".to_string()]);

    service.stop();
}
