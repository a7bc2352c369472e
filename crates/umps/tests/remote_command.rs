// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote command plane: registration, commands, liveness.

use std::sync::Arc;
use std::time::{Duration, Instant};

use umps::message_formats::Message;
use umps::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use umps::messaging::Context;
use umps::proxy_services::command::{
    ModuleState, Proxy, ProxyOptions, Replier, ReplierOptions, Requestor, RequestorOptions,
    RegistrationRequest,
};
use umps::services::command::{CommandRequest, CommandResponse, ModuleDetails};

fn start_proxy(context: &Context, frontend: &str, backend: &str, ping: Duration) -> Proxy {
    let proxy = Proxy::new(context);
    let mut options = ProxyOptions::new();
    options.set_frontend_address(frontend).expect("frontend");
    options.set_backend_address(backend).expect("backend");
    options.set_ping_interval(ping).expect("ping interval");
    options.set_max_missed_pings(3).expect("miss budget");
    proxy.initialize(&options).expect("proxy init");
    proxy.start().expect("proxy start");
    proxy
}

#[test]
fn register_list_and_command() {
    let context = Context::new();
    let base = 34000 + fastrand::u16(0..10000);
    let frontend = format!("tcp://127.0.0.1:{}", base);
    let backend = format!("tcp://127.0.0.1:{}", base + 1);
    let proxy = start_proxy(&context, &frontend, &backend, Duration::from_millis(200));

    let mut details = ModuleDetails::new();
    details.set_name("scanner").expect("name");

    let mut replier_options = ReplierOptions::new();
    replier_options.set_address(&backend).expect("address");
    replier_options.set_module_details(&details).expect("details");
    replier_options.set_callback(Arc::new(|_message_type, _payload| {
        let mut response = CommandResponse::new();
        response.set_standard_output("scanning 3 channels");
        Ok(Box::new(response) as Box<dyn Message>)
    }));
    let replier = Replier::new(&context);
    replier.initialize(&replier_options).expect("replier init");
    replier.start().expect("replier start");

    // Registration propagates.
    let deadline = Instant::now() + Duration::from_secs(5);
    while proxy.module_state("scanner").is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(matches!(
        proxy.module_state("scanner"),
        Some(ModuleState::Alive | ModuleState::Missed)
    ));

    let mut client_options = RequestorOptions::new();
    client_options.set_address(&frontend).expect("address");
    client_options.set_time_out(Some(Duration::from_secs(5)));
    let mut client = Requestor::new(&context);
    client.initialize(&client_options).expect("client init");

    let modules = client.available_modules().expect("listing");
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name(), "scanner");

    let request = CommandRequest::from_command("status").expect("command");
    let response = client.issue_command("scanner", &request).expect("command");
    assert_eq!(response.exit_code(), 0);
    assert_eq!(response.standard_output(), "scanning 3 channels");

    // Addressing a ghost module fails cleanly.
    assert!(client.issue_command("ghost", &request).is_err());

    replier.stop();
    proxy.stop();
}

#[test]
fn silent_module_goes_dead_after_missed_pings() {
    let context = Context::new();
    let base = 34000 + fastrand::u16(0..10000);
    let frontend = format!("tcp://127.0.0.1:{}", base);
    let backend = format!("tcp://127.0.0.1:{}", base + 1);
    let proxy = start_proxy(&context, &frontend, &backend, Duration::from_millis(100));

    // A bare dealer that registers but never answers pings.
    let mut socket_options = SocketOptions::new();
    socket_options.set_routing_identifier(b"mute").expect("identity");
    let socket = Socket::new(SocketType::Dealer, socket_options);
    socket
        .connect(&Endpoint::parse(&backend).expect("endpoint"))
        .expect("connect");

    let mut details = ModuleDetails::new();
    details.set_name("mute").expect("name");
    let mut registration = RegistrationRequest::new();
    registration.set_module_details(&details).expect("details");
    let payload = registration.to_bytes().expect("encode");
    socket
        .send(vec![
            Vec::new(),
            registration.message_type().as_bytes().to_vec(),
            payload,
        ])
        .expect("register");

    let deadline = Instant::now() + Duration::from_secs(5);
    while proxy.module_state("mute").is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(proxy.module_state("mute").is_some());

    // Three unanswered pings at 100 ms apiece put it under well inside
    // the deadline.
    let deadline = Instant::now() + Duration::from_secs(10);
    while proxy.module_state("mute") != Some(ModuleState::Dead) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(proxy.module_state("mute"), Some(ModuleState::Dead));
    assert!(proxy.available_modules().is_empty());

    socket.close();
    proxy.stop();
}
