//! Integration tests for the client dispatch loop, driven by a
//! hand-rolled server side over real sockets.

use rondo_client::{Client, ClientConfig, MethodTable};
use rondo_protocol::{ClientId, Message, DEFAULT_DELIMITER};
use rondo_transport::{FramedChannel, TcpTransport};
use serde_json::{json, Value};

/// Accepts one client and completes the server side of the handshake.
async fn accept_one(id: &str) -> (FramedChannel, tokio::task::JoinHandle<Client>) {
    let transport = TcpTransport::bind("127.0.0.1", 0, 16, DEFAULT_DELIMITER)
        .await
        .unwrap();
    let addr = transport.local_addr().unwrap();

    let config = ClientConfig::new("127.0.0.1", addr.port());
    let client_task = tokio::spawn(async move {
        Client::connect(&config).await.expect("client should connect")
    });

    let (mut channel, _) = transport.accept().await.unwrap();
    channel
        .send(&Message::Handshake {
            id: ClientId::from(id),
        })
        .await
        .unwrap();
    let ack = channel.recv().await.unwrap();
    assert_eq!(
        ack,
        Message::HandshakeAck {
            id: ClientId::from(id),
        }
    );

    (channel, client_task)
}

fn table_with_roll() -> MethodTable {
    let mut methods = MethodTable::new();
    methods.register_fn("roll", |params: Vec<Value>| {
        let sides = params.first().and_then(Value::as_u64).unwrap_or(6);
        Ok(json!(sides)) // deterministic "roll" for the test
    });
    methods.register_fn("explode", |_| Err("kaboom".into()));
    methods
}

#[tokio::test]
async fn test_connect_stores_assigned_id() {
    let (channel, client_task) = accept_one("7:feed").await;
    let client = client_task.await.unwrap();
    assert_eq!(client.id(), &ClientId::from("7:feed"));
    drop(channel);
}

#[tokio::test]
async fn test_serve_replies_result_for_known_method() {
    let (mut channel, client_task) = accept_one("1:a").await;
    let mut client = client_task.await.unwrap();

    let serve = tokio::spawn(async move {
        let methods = table_with_roll();
        client.serve(&methods).await.unwrap();
        client
    });

    channel
        .send(&Message::MethodRequest {
            method: "roll".into(),
            params: Some(vec![json!(20)]),
        })
        .await
        .unwrap();
    assert_eq!(
        channel.recv().await.unwrap(),
        Message::MethodResult { result: json!(20) }
    );

    channel.send(&Message::End).await.unwrap();
    serve.await.unwrap();
}

#[tokio::test]
async fn test_serve_replies_not_implemented_for_unknown_method() {
    let (mut channel, client_task) = accept_one("1:b").await;
    let mut client = client_task.await.unwrap();

    let serve = tokio::spawn(async move {
        let methods = table_with_roll();
        client.serve(&methods).await.unwrap();
    });

    channel
        .send(&Message::MethodRequest {
            method: "fly".into(),
            params: None,
        })
        .await
        .unwrap();
    assert_eq!(
        channel.recv().await.unwrap(),
        Message::ErrorMethodNotImplemented {
            method: "fly".into(),
        }
    );

    channel.send(&Message::End).await.unwrap();
    serve.await.unwrap();
}

#[tokio::test]
async fn test_serve_converts_handler_failure_into_exception_reply() {
    let (mut channel, client_task) = accept_one("1:c").await;
    let mut client = client_task.await.unwrap();

    let serve = tokio::spawn(async move {
        let methods = table_with_roll();
        // The loop must survive the failing handler and keep serving.
        client.serve(&methods).await.unwrap();
    });

    channel
        .send(&Message::MethodRequest {
            method: "explode".into(),
            params: None,
        })
        .await
        .unwrap();
    assert_eq!(
        channel.recv().await.unwrap(),
        Message::ErrorMethodException {
            method: "explode".into(),
            error: "kaboom".into(),
        }
    );

    // Still alive: a normal call works after the failure.
    channel
        .send(&Message::MethodRequest {
            method: "roll".into(),
            params: None,
        })
        .await
        .unwrap();
    assert_eq!(
        channel.recv().await.unwrap(),
        Message::MethodResult { result: json!(6) }
    );

    channel.send(&Message::End).await.unwrap();
    serve.await.unwrap();
}

#[tokio::test]
async fn test_serve_terminates_on_end() {
    let (mut channel, client_task) = accept_one("1:d").await;
    let mut client = client_task.await.unwrap();

    channel.send(&Message::End).await.unwrap();

    let methods = MethodTable::new();
    client.serve(&methods).await.expect("END is a clean exit");
}
