use rasp::base::engineerror::{EngineError, ErrorKind};
use rasp::engine::{Engine, FetchOptions};
use rasp::http::headerset::HeaderSet;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one request head off `socket`.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn respond(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        extra_headers,
        body.len(),
        body
    )
}

/// Serve every connection with `handler(request) -> raw response`.
async fn serve<F>(handler: F) -> String
where
    F: Fn(&str) -> String + Send + Sync + Clone + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let response = handler(&request);
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        }
    });

    format!("http://{}", addr)
}

/// Body is the request head, lowercased, so tests can look for headers.
async fn echo_server() -> String {
    serve(|request| respond("200 OK", "", &request.to_ascii_lowercase())).await
}

#[tokio::test]
async fn test_fetch_sends_base_headers() {
    let base = echo_server().await;
    let engine = Engine::builder()
        .header("Content-Type", "text/json")
        .header("X-Rasp", "1")
        .build()
        .unwrap();

    let page = engine
        .get(&format!("{}/echo-headers/", base))
        .await
        .unwrap()
        .expect("page");
    assert_eq!(page.status(), 200);
    assert!(page.source().contains("get /echo-headers/ http/1.1"));
    assert!(page.source().contains("content-type: text/json"));
    assert!(page.source().contains("x-rasp: 1"));
}

#[tokio::test]
async fn test_curry_keeps_headers_from_creation() {
    let base = echo_server().await;
    let url = format!("{}/echo-headers/", base);

    let mut engine = Engine::builder()
        .header("Content-Type", "text/json")
        .build()
        .unwrap();
    let get_json = engine.curry();
    engine.set_header("Content-Type", "text/xml").unwrap();

    let curried = get_json.get(&url).await.unwrap().unwrap();
    assert!(curried.source().contains("content-type: text/json"));
    assert!(!curried.source().contains("text/xml"));

    let direct = engine.get(&url).await.unwrap().unwrap();
    assert!(direct.source().contains("content-type: text/xml"));
}

#[tokio::test]
async fn test_per_call_headers_do_not_touch_base() {
    let base = echo_server().await;
    let url = format!("{}/", base);
    let engine = Engine::builder().header("Accept", "text/html").build().unwrap();

    let page = engine
        .fetch(&url, FetchOptions::new().header("Accept", "application/json"))
        .await
        .unwrap()
        .unwrap();
    assert!(page.source().contains("accept: application/json"));
    assert!(!page.source().contains("accept: text/html"));
    assert_eq!(engine.headers().get_str("Accept"), Some("text/html"));
}

#[tokio::test]
async fn test_query_params_are_encoded() {
    let base = echo_server().await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    let page = engine
        .fetch(
            &format!("{}/search", base),
            FetchOptions::new().param("q", "tor project").param("page", "2"),
        )
        .await
        .unwrap()
        .unwrap();
    assert!(page.source().contains("get /search?q=tor+project&page=2 http/1.1"));
}

#[tokio::test]
async fn test_not_found_statuses_are_absent() {
    let base = serve(|request| {
        if request.starts_with("GET /gone") {
            respond("410 Gone", "", "gone")
        } else {
            respond("404 Not Found", "", "missing")
        }
    })
    .await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    assert!(engine.get(&format!("{}/missing", base)).await.unwrap().is_none());
    assert!(engine.get(&format!("{}/gone", base)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let base = serve(|_| respond("500 Internal Server Error", "", "oops")).await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    let err = engine.get(&format!("{}/", base)).await.unwrap_err();
    match err {
        EngineError::HttpStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("Expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_response_headers_keep_order() {
    let base = serve(|_| {
        respond(
            "200 OK",
            "X-First: 1\r\nX-Second: 2\r\nX-Third: 3\r\n",
            "ok",
        )
    })
    .await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    let page = engine.get(&format!("{}/", base)).await.unwrap().unwrap();
    let names: Vec<&str> = page
        .headers()
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| name.starts_with("x-"))
        .collect();
    assert_eq!(names, vec!["x-first", "x-second", "x-third"]);
    assert_eq!(page.header("X-SECOND"), Some("2"));
    assert_eq!(page.source(), "ok");
}

fn cookie_handler(request: &str) -> String {
    if request.starts_with("GET /set") {
        respond("200 OK", "Set-Cookie: session=abc123; Path=/\r\n", "set")
    } else if request.to_ascii_lowercase().contains("cookie: session=abc123") {
        respond("200 OK", "", "has-cookie")
    } else {
        respond("200 OK", "", "no-cookie")
    }
}

#[tokio::test]
async fn test_session_keeps_cookies_between_fetches() {
    let base = serve(cookie_handler).await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    engine.get(&format!("{}/set", base)).await.unwrap();
    let page = engine.get(&format!("{}/check", base)).await.unwrap().unwrap();
    assert_eq!(page.source(), "has-cookie");

    // Curried fetches share the session.
    let curried = engine.curry();
    let page = curried.get(&format!("{}/check", base)).await.unwrap().unwrap();
    assert_eq!(page.source(), "has-cookie");
}

#[tokio::test]
async fn test_duplicate_has_its_own_session() {
    let base = serve(cookie_handler).await;
    let engine = Engine::new(HeaderSet::new()).unwrap();
    engine.get(&format!("{}/set", base)).await.unwrap();

    let copy = engine.duplicate().unwrap();
    let page = copy.get(&format!("{}/check", base)).await.unwrap().unwrap();
    assert_eq!(page.source(), "no-cookie");
}

#[tokio::test]
async fn test_refused_connection_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = Engine::new(HeaderSet::new()).unwrap();
    let err = engine.get(&format!("http://{}/", addr)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_body() {
    let base = serve(|_| {
        respond(
            "200 OK",
            "Content-Type: application/json\r\n",
            r#"{"ip":"10.1.2.3","tor":true}"#,
        )
    })
    .await;
    let engine = Engine::new(HeaderSet::new()).unwrap();

    let page = engine.get(&format!("{}/ip", base)).await.unwrap().unwrap();
    let value: serde_json::Value = page.json().unwrap();
    assert_eq!(value["ip"], "10.1.2.3");
    assert_eq!(value["tor"], true);
}
