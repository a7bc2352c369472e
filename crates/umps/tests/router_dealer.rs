// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Load-balanced request/reply through the router/dealer proxy.

use std::sync::Arc;
use std::time::Duration;

use umps::message_formats::{downcast, Message, Messages, Text};
use umps::messaging::request_router::{Requestor, RequestorOptions};
use umps::messaging::router_dealer::{Proxy, ProxyOptions, Reply, ReplyOptions};
use umps::messaging::Context;

#[test]
fn three_clients_two_servers_echo() {
    let context = Context::new();
    let base = 32000 + fastrand::u16(0..10000);
    let frontend = format!("tcp://127.0.0.1:{}", base);
    let backend = format!("tcp://127.0.0.1:{}", base + 1);

    let proxy = Proxy::new(&context);
    let mut proxy_options = ProxyOptions::new();
    proxy_options.set_frontend_address(&frontend).expect("frontend");
    proxy_options.set_backend_address(&backend).expect("backend");
    proxy.initialize(&proxy_options).expect("proxy init");
    proxy.start().expect("proxy start");

    let echo = |_message_type: &str, payload: &[u8]| -> umps::Result<Box<dyn Message>> {
        let mut text = Text::new();
        text.from_bytes(payload)?;
        let reply = text.contents().replacen("request", "reply", 1);
        Ok(Box::new(Text::from_contents(&reply)) as Box<dyn Message>)
    };

    let servers: Vec<Reply> = (0..2)
        .map(|_| {
            let mut options = ReplyOptions::new();
            options.set_address(&backend).expect("address");
            options.set_callback(Arc::new(echo));
            let server = Reply::new(&context);
            server.initialize(&options).expect("server init");
            server.start().expect("server start");
            server
        })
        .collect();

    let mut formats = Messages::new();
    formats.add(Box::new(Text::new())).expect("register");

    let clients: Vec<Requestor> = (0..3)
        .map(|_| {
            let mut options = RequestorOptions::new();
            options.set_address(&frontend).expect("address");
            options.set_time_out(Some(Duration::from_secs(5)));
            options.set_message_formats(&formats).expect("formats");
            let mut client = Requestor::new(&context);
            client.initialize(&options).expect("client init");
            client
        })
        .collect();

    for (c, client) in clients.iter().enumerate() {
        for i in 0..5 {
            let request = Text::from_contents(&format!("request {}-{}", c, i));
            let reply = client
                .request(&request)
                .expect("request")
                .expect("timed out");
            let reply = downcast::<Text>(reply).expect("text");
            assert_eq!(reply.contents(), format!("reply {}-{}", c, i));
        }
    }

    for server in &servers {
        server.stop();
        assert!(!server.is_running());
    }
    proxy.stop();
}

#[test]
fn panicking_callback_yields_failure_sentinel() {
    let context = Context::new();
    let base = 32000 + fastrand::u16(0..10000);
    let frontend = format!("tcp://127.0.0.1:{}", base);
    let backend = format!("tcp://127.0.0.1:{}", base + 1);

    let proxy = Proxy::new(&context);
    let mut proxy_options = ProxyOptions::new();
    proxy_options.set_frontend_address(&frontend).expect("frontend");
    proxy_options.set_backend_address(&backend).expect("backend");
    proxy.initialize(&proxy_options).expect("proxy init");
    proxy.start().expect("proxy start");

    let mut options = ReplyOptions::new();
    options.set_address(&backend).expect("address");
    options.set_callback(Arc::new(|_t: &str, _p: &[u8]| -> umps::Result<Box<dyn Message>> {
        panic!("callback exploded");
    }));
    let server = Reply::new(&context);
    server.initialize(&options).expect("server init");
    server.start().expect("server start");

    let mut formats = Messages::new();
    formats.add(Box::new(Text::new())).expect("register text");
    formats
        .add(Box::new(umps::message_formats::Failure::new()))
        .expect("register failure");

    let mut client_options = RequestorOptions::new();
    client_options.set_address(&frontend).expect("address");
    client_options.set_time_out(Some(Duration::from_secs(5)));
    client_options.set_message_formats(&formats).expect("formats");
    let mut client = Requestor::new(&context);
    client.initialize(&client_options).expect("client init");

    let reply = client
        .request(&Text::from_contents("boom"))
        .expect("request")
        .expect("timed out");
    let failure = downcast::<umps::message_formats::Failure>(reply).expect("failure sentinel");
    assert!(failure.details().contains("panicked"));

    server.stop();
    proxy.stop();
}
