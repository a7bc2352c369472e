// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local IPC command plane end-to-end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use umps::message_formats::{downcast, Message, Messages};
use umps::messaging::request_router::{Requestor, RequestorOptions};
use umps::messaging::Context;
use umps::services::command::{
    AvailableCommandsRequest, AvailableCommandsResponse, CommandRequest, CommandResponse,
    ModuleDetails, ModuleTable, Service, ServiceOptions, TerminateRequest, TerminateResponse,
};

fn scanner_callback() -> umps::messaging::MessageCallback {
    Arc::new(|message_type, payload| {
        if message_type == AvailableCommandsRequest::new().message_type() {
            let mut response = AvailableCommandsResponse::new();
            response.set_commands("status -- report the channels being scanned\n");
            return Ok(Box::new(response) as Box<dyn Message>);
        }
        let mut request = CommandRequest::new();
        request.from_bytes(payload)?;
        let mut response = CommandResponse::new();
        if request.command() == "status" {
            response.set_exit_code(0);
            response.set_standard_output("scanning 3 channels");
        } else {
            response.set_exit_code(1);
            response.set_standard_error("unknown command");
        }
        Ok(Box::new(response) as Box<dyn Message>)
    })
}

#[test]
fn list_issue_and_terminate() {
    let context = Context::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let mut details = ModuleDetails::new();
    details.set_name("scanner").expect("name");

    let mut options = ServiceOptions::new();
    options.set_module_details(&details).expect("details");
    options.set_ipc_directory(dir.path());
    options.set_callback(scanner_callback());

    let service = Service::new(&context);
    service.initialize(&options).expect("service init");
    service.start().expect("service start");
    assert!(service.is_running());

    // Clients discover the endpoint through the module table.
    let table = ModuleTable::open(dir.path()).expect("table");
    let ipc_address = table
        .ipc_path("scanner")
        .expect("lookup")
        .expect("scanner registered");

    let mut formats = Messages::new();
    formats
        .add(Box::new(AvailableCommandsResponse::new()))
        .expect("register");
    formats.add(Box::new(CommandResponse::new())).expect("register");
    formats.add(Box::new(TerminateResponse::new())).expect("register");

    let mut client_options = RequestorOptions::new();
    client_options.set_address(&ipc_address).expect("address");
    client_options.set_time_out(Some(Duration::from_secs(5)));
    client_options.set_message_formats(&formats).expect("formats");
    let mut client = Requestor::new(&context);
    client.initialize(&client_options).expect("client init");

    let reply = client
        .request(&AvailableCommandsRequest::new())
        .expect("request")
        .expect("timed out");
    let listing = downcast::<AvailableCommandsResponse>(reply).expect("listing");
    assert!(listing.commands().contains("status"));

    let request = CommandRequest::from_command("status").expect("command");
    let reply = client.request(&request).expect("request").expect("timed out");
    let response = downcast::<CommandResponse>(reply).expect("response");
    assert_eq!(response.exit_code(), 0);
    assert!(!response.standard_output().is_empty());

    let reply = client
        .request(&TerminateRequest::new())
        .expect("request")
        .expect("timed out");
    let response = downcast::<TerminateResponse>(reply).expect("terminate response");
    assert!(response.accepted());

    // The module shuts itself down within the advertised bound.
    let deadline = Instant::now() + Duration::from_secs(5);
    while service.is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(!service.is_running());
    assert!(service.was_terminated());

    service.stop();
    let table = ModuleTable::open(dir.path()).expect("table");
    assert!(table.ipc_path("scanner").expect("lookup").is_none());
}
