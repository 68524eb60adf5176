// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Protocol round trips against a live server.

use reedflow::datastore::Datastore;
use reedflow::record::{FieldValue, Record};
use reedflow::server::protocol::{read_frame, write_frame};
use reedflow::server::{
    EventKind, Query, QueryEnvelope, Request, Response, Server, StartListen,
};
use reedflow::transform::{
    ExpressionValue, Function, FunctionExpression, FunctionOperator, Transform,
};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn row(fields: &[(&str, FieldValue)]) -> Record {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Start a server with `people` and a derived `next_year` table, return
/// its address. The TempDir must outlive the test.
fn start_server(dir: &TempDir) -> SocketAddr {
    let mut datastore = Datastore::open(dir.path().join("db")).unwrap();
    datastore.add_source_table("people").unwrap();
    datastore
        .add_derived_table(
            "next_year",
            Transform::Function(Function::new(
                vec![FunctionExpression::new(
                    FunctionOperator::Add,
                    ExpressionValue::Field("age".to_string()),
                    ExpressionValue::Scalar(FieldValue::Integer(1)),
                    "incremented",
                )],
                "people",
                "next_year",
            )),
        )
        .unwrap();

    let server = Server::bind("127.0.0.1:0", datastore).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.serve());
    addr
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

fn send(stream: &mut TcpStream, request: &Request) {
    let payload = serde_json::to_vec(request).unwrap();
    write_frame(stream, &payload).unwrap();
}

fn receive(stream: &mut TcpStream) -> Response {
    let payload = read_frame(stream).unwrap().expect("connection closed");
    serde_json::from_slice(&payload).unwrap()
}

fn insert_request(id: &str, table: &str, key: &str, entry: Record) -> Request {
    Request::Query(QueryEnvelope {
        request_id: id.to_string(),
        query: Query::InsertData {
            table: table.to_string(),
            key: FieldValue::from(key),
            entry,
        },
    })
}

fn find_one_request(id: &str, table: &str, key: &str) -> Request {
    Request::Query(QueryEnvelope {
        request_id: id.to_string(),
        query: Query::FindOne {
            table: table.to_string(),
            column: "key".to_string(),
            key: FieldValue::from(key),
        },
    })
}

/// Poll FindOne until a row appears; inserts apply asynchronously.
fn wait_for_row(stream: &mut TcpStream, table: &str, key: &str) -> Record {
    for _ in 0..200 {
        send(stream, &find_one_request("poll", table, key));
        match receive(stream) {
            Response::QueryResult { rows, .. } if !rows.is_empty() => {
                return rows[0].entry.clone();
            }
            Response::QueryResult { .. } => thread::sleep(Duration::from_millis(10)),
            other => panic!("unexpected response: {:?}", other),
        }
    }
    panic!("row {}/{} never appeared", table, key);
}

#[test]
fn insert_is_acknowledged_and_applied() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir);
    let mut stream = connect(addr);

    send(
        &mut stream,
        &insert_request("r1", "people", "ada", row(&[("age", FieldValue::Integer(36))])),
    );
    match receive(&mut stream) {
        Response::QueryResult { request_id, rows } => {
            assert_eq!(request_id, "r1");
            assert!(rows.is_empty());
        }
        other => panic!("unexpected response: {:?}", other),
    }

    let entry = wait_for_row(&mut stream, "people", "ada");
    assert_eq!(entry.get("age"), Some(&FieldValue::Integer(36)));

    // The cascade ran before the insert became visible.
    let derived = wait_for_row(&mut stream, "next_year", "ada");
    assert_eq!(derived.get("incremented"), Some(&FieldValue::Integer(37)));
}

#[test]
fn find_one_on_missing_key_returns_no_rows() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir);
    let mut stream = connect(addr);

    send(&mut stream, &find_one_request("r1", "people", "nobody"));
    match receive(&mut stream) {
        Response::QueryResult { request_id, rows } => {
            assert_eq!(request_id, "r1");
            assert!(rows.is_empty());
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn unknown_table_reports_an_error_response() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir);
    let mut stream = connect(addr);

    send(&mut stream, &find_one_request("r1", "ghost", "k"));
    match receive(&mut stream) {
        Response::Error { request_id, message } => {
            assert_eq!(request_id.as_deref(), Some("r1"));
            assert!(message.contains("ghost"));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn range_query_returns_rows_in_key_order() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir);
    let mut stream = connect(addr);

    for (key, age) in [("a", 10), ("b", 20), ("c", 30)] {
        send(
            &mut stream,
            &insert_request("w", "people", key, row(&[("age", FieldValue::Integer(age))])),
        );
        receive(&mut stream);
    }
    wait_for_row(&mut stream, "people", "c");

    send(
        &mut stream,
        &Request::Query(QueryEnvelope {
            request_id: "r2".to_string(),
            query: Query::GreaterThan {
                table: "people".to_string(),
                column: "key".to_string(),
                key: FieldValue::from("a"),
            },
        }),
    );
    match receive(&mut stream) {
        Response::QueryResult { rows, .. } => {
            let keys: Vec<FieldValue> = rows.iter().map(|r| r.key.clone()).collect();
            assert_eq!(keys, vec![FieldValue::from("b"), FieldValue::from("c")]);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn listener_receives_derived_table_events() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir);

    let mut listener = connect(addr);
    send(
        &mut listener,
        &Request::StartListen(StartListen {
            table_name: "next_year".to_string(),
            event: EventKind::Insert,
        }),
    );
    // Registration has no acknowledgement; give the handler a moment.
    thread::sleep(Duration::from_millis(100));

    let mut writer = connect(addr);
    send(
        &mut writer,
        &insert_request("r1", "people", "ada", row(&[("age", FieldValue::Integer(36))])),
    );
    receive(&mut writer);

    match receive(&mut listener) {
        Response::Event(event) => {
            assert_eq!(event.table_name, "next_year");
            assert_eq!(event.event, EventKind::Insert);
            assert_eq!(event.value.get("incremented"), Some(&FieldValue::Integer(37)));
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}
