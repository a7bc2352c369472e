// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ZAP enforcement across a live service.

use std::sync::Arc;
use std::time::Duration;

use umps::authentication::{SqliteAuthenticator, UserNameAndPassword, ZapOptions};
use umps::message_formats::{Message, Messages, Text};
use umps::messaging::request_router::{Requestor, RequestorOptions, Router, RouterOptions};
use umps::messaging::Context;

fn echo_router(
    context: &Context,
    address: &str,
    zap: &ZapOptions,
    authenticator: SqliteAuthenticator,
) -> Router {
    let router = Router::with_authenticator(context, Arc::new(authenticator));
    let mut options = RouterOptions::new();
    options.set_address(address).expect("address");
    options.set_zap_options(zap);
    options.set_callback(Arc::new(|_message_type, payload| {
        let mut text = Text::new();
        text.from_bytes(payload)?;
        Ok(Box::new(text) as Box<dyn Message>)
    }));
    router.initialize(&options).expect("router init");
    router.start().expect("router start");
    router
}

fn make_client(context: &Context, address: &str, zap: &ZapOptions) -> Requestor {
    let mut formats = Messages::new();
    formats.add(Box::new(Text::new())).expect("register");
    let mut options = RequestorOptions::new();
    options.set_address(address).expect("address");
    options.set_time_out(Some(Duration::from_millis(1500)));
    options.set_zap_options(zap);
    options.set_message_formats(&formats).expect("formats");
    let mut client = Requestor::new(context);
    client.initialize(&options).expect("client init");
    client
}

#[test]
fn strawhouse_blacklist_denies_the_peer() {
    let context = Context::new();
    let address = format!("tcp://127.0.0.1:{}", 35000 + fastrand::u16(0..10000));

    let authenticator = SqliteAuthenticator::in_memory().expect("open");
    authenticator.add_to_blacklist("127.0.0.1").expect("blacklist");

    let mut server_zap = ZapOptions::new();
    server_zap.set_strawhouse_server();
    let router = echo_router(&context, &address, &server_zap, authenticator);

    let mut client_zap = ZapOptions::new();
    client_zap.set_strawhouse_client();
    let client = make_client(&context, &address, &client_zap);

    // The handshake is refused, so the request never completes.
    let result = client.request(&Text::from_contents("hello"));
    assert!(matches!(result, Ok(None)));

    router.stop();
}

#[test]
fn strawhouse_open_lists_admit_the_peer() {
    let context = Context::new();
    let address = format!("tcp://127.0.0.1:{}", 35000 + fastrand::u16(0..10000));

    let authenticator = SqliteAuthenticator::in_memory().expect("open");
    let mut server_zap = ZapOptions::new();
    server_zap.set_strawhouse_server();
    let router = echo_router(&context, &address, &server_zap, authenticator);

    let mut client_zap = ZapOptions::new();
    client_zap.set_strawhouse_client();
    let client = make_client(&context, &address, &client_zap);

    let reply = client
        .request(&Text::from_contents("hello"))
        .expect("request")
        .expect("timed out");
    assert_eq!(reply.message_type(), "UMPS::MessageFormats::Text");

    router.stop();
}

#[test]
fn woodhouse_checks_credentials() {
    let context = Context::new();
    let address = format!("tcp://127.0.0.1:{}", 35000 + fastrand::u16(0..10000));

    let authenticator = SqliteAuthenticator::in_memory().expect("open");
    authenticator
        .add_user(
            "operator",
            "magma",
            None,
            umps::authentication::UserPrivileges::ReadWrite,
        )
        .expect("add user");

    let mut server_zap = ZapOptions::new();
    server_zap.set_woodhouse_server();
    let router = echo_router(&context, &address, &server_zap, authenticator);

    // Wrong password: denied.
    let mut bad_zap = ZapOptions::new();
    bad_zap.set_woodhouse_client(&UserNameAndPassword::new("operator", "basalt").unwrap());
    let bad_client = make_client(&context, &address, &bad_zap);
    assert!(matches!(
        bad_client.request(&Text::from_contents("hello")),
        Ok(None)
    ));

    // Right password: served.
    let mut good_zap = ZapOptions::new();
    good_zap.set_woodhouse_client(&UserNameAndPassword::new("operator", "magma").unwrap());
    let good_client = make_client(&context, &address, &good_zap);
    let reply = good_client
        .request(&Text::from_contents("hello"))
        .expect("request");
    assert!(reply.is_some());

    router.stop();
}
