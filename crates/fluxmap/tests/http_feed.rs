use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use fluxmap::{FeedError, FetchLoop, HttpTrafficFeed, TrafficFeed};

mod common;

#[test]
fn fetches_and_decodes_a_snapshot() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let body = serde_json::to_string(&common::snapshot(
        99,
        vec![common::region(
            "us-east-1",
            vec![common::service("api", "normal", 40.0, 2.0)],
            vec![common::connection("api", "db", 40.0, 2.0)],
        )],
    ))
    .expect("encode");
    let server = serve_once(listener, "200 OK", body);

    let feed =
        HttpTrafficFeed::new(format!("http://{addr}/traffic"), Duration::from_secs(2)).expect("client");
    let snapshot = feed.fetch(42).expect("fetch");

    assert_eq!(snapshot.name, "edge");
    assert_eq!(snapshot.server_update_time, Some(99));
    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.nodes[0].connections[0].source, "api");

    let request = server.join().expect("server");
    let request_line = request.lines().next().unwrap_or("");
    assert!(
        request_line.starts_with("GET /traffic?offset=42"),
        "unexpected request line: {request_line}"
    );
    assert!(request.to_ascii_lowercase().contains("accept: application/json"));
}

#[test]
fn propagates_http_status_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = serve_once(listener, "503 Service Unavailable", String::new());

    let feed =
        HttpTrafficFeed::new(format!("http://{addr}/traffic"), Duration::from_secs(2)).expect("client");
    let err = feed.fetch(0).expect_err("should fail");
    assert_eq!(err, FeedError::HttpStatus { code: 503 });

    server.join().expect("server");
}

#[test]
fn reports_unreachable_hosts() {
    // Bind to learn a free port, then close it again.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr")
    };

    let feed =
        HttpTrafficFeed::new(format!("http://{addr}/traffic"), Duration::from_secs(2)).expect("client");
    let err = feed.fetch(0).expect_err("should fail");
    assert!(matches!(err, FeedError::Http { .. }), "got {err:?}");
}

#[test]
fn rejects_malformed_payloads() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = serve_once(listener, "200 OK", "not a snapshot".to_string());

    let feed =
        HttpTrafficFeed::new(format!("http://{addr}/traffic"), Duration::from_secs(2)).expect("client");
    let err = feed.fetch(0).expect_err("should fail");
    assert!(matches!(err, FeedError::DecodeResponse { .. }), "got {err:?}");

    server.join().expect("server");
}

#[test]
fn poll_loop_drives_the_feed_over_http() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = thread::spawn(move || {
        for serial in 1..=2u64 {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            assert!(request.contains("offset=0"), "unexpected request: {request}");
            let body = serde_json::to_string(&common::snapshot(
                serial,
                vec![common::region(
                    "us-east-1",
                    vec![common::service("api", "normal", serial as f64, 0.0)],
                    vec![],
                )],
            ))
            .expect("encode");
            write_response(&mut stream, "200 OK", &body);
        }
    });

    let feed =
        HttpTrafficFeed::new(format!("http://{addr}/traffic"), Duration::from_secs(2)).expect("client");
    let pool = FetchLoop::spawn(feed, Duration::from_millis(10));

    let first = pool
        .recv_event_timeout(Duration::from_secs(5))
        .expect("first event");
    let second = pool
        .recv_event_timeout(Duration::from_secs(5))
        .expect("second event");
    assert_eq!(first.seq, 1);
    assert_eq!(second.seq, 2);
    assert_eq!(
        second.outcome.expect("snapshot").server_update_time,
        Some(2)
    );

    pool.stop();
    server.join().expect("server");
}

fn serve_once(listener: TcpListener, status_line: &'static str, body: String) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        write_response(&mut stream, status_line, &body);
        request
    })
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = [0u8; 4096];
    let mut request = String::new();
    loop {
        let read = stream.read(&mut buffer).expect("read request");
        if read == 0 {
            break;
        }
        request.push_str(&String::from_utf8_lossy(&buffer[..read]));
        if request.contains("\r\n\r\n") {
            break;
        }
    }
    request
}

fn write_response(stream: &mut TcpStream, status_line: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).expect("write response");
    stream.flush().expect("flush");
}
