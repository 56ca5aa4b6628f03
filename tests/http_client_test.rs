use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use backoffice::{
    ApiRequest, AuthSession, BackofficeError, HttpClient, SessionEvent, SignOutReason, Transport,
};

/// Serve one canned response and hand back the raw request head.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&received).to_string()
    });

    (base_url, handle)
}

fn signed_in_session() -> Arc<AuthSession> {
    let session = Arc::new(AuthSession::in_memory());
    session.set("abc123").unwrap();
    session
}

#[tokio::test]
async fn test_sends_bearer_token_and_query() {
    let (base_url, server) = serve_once("200 OK", r#"{"status":true,"data":[]}"#).await;
    let client = HttpClient::new(&base_url, Duration::from_secs(5), signed_in_session()).unwrap();

    let body = client
        .send(ApiRequest::get("products").query("page", 2).query("search", "tea"))
        .await
        .unwrap();
    assert_eq!(body["status"], true);

    let head = server.await.unwrap();
    let request_line = head.lines().next().unwrap();
    assert_eq!(request_line, "GET /api/products?page=2&search=tea HTTP/1.1");
    assert!(
        head.to_lowercase().contains("authorization: bearer abc123"),
        "request was:\n{head}"
    );
}

#[tokio::test]
async fn test_unauthorized_signs_out() {
    let (base_url, server) =
        serve_once("401 Unauthorized", r#"{"message":"Unauthenticated."}"#).await;
    let session = signed_in_session();
    let mut events = session.subscribe();
    let client = HttpClient::new(&base_url, Duration::from_secs(5), Arc::clone(&session)).unwrap();

    let err = client.send(ApiRequest::get("brands")).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, BackofficeError::Auth));
    assert!(!session.is_signed_in());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::Unauthorized
        }
    );
}

#[tokio::test]
async fn test_backend_message_is_surfaced() {
    let (base_url, server) = serve_once(
        "422 Unprocessable Entity",
        r#"{"message":"The given data was invalid.","errors":{"sku":["The sku has already been taken."]}}"#,
    )
    .await;
    let client = HttpClient::new(&base_url, Duration::from_secs(5), signed_in_session()).unwrap();

    let err = client.send(ApiRequest::post("products")).await.unwrap_err();
    server.await.unwrap();
    match err {
        BackofficeError::Request { status, message } => {
            assert_eq!(status, Some(422));
            assert_eq!(message, "The given data was invalid.");
        }
        other => panic!("expected request error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpClient::new(
        &format!("http://{addr}/"),
        Duration::from_secs(5),
        signed_in_session(),
    )
    .unwrap();
    let err = client.send(ApiRequest::get("products")).await.unwrap_err();
    assert!(matches!(err, BackofficeError::Network(_)));
}
