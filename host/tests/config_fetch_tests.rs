use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use host::config::{ConfigError, ConfigSource, GameConfig, load_config, try_load_config};

/// Serves exactly one canned HTTP response on a loopback port and returns its base URL.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });
    (format!("http://{addr}"), handle)
}

#[test]
fn http_config_is_fetched_and_parsed() {
    let (base, server) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"defaultRows":16,"defaultCols":8,"defaultMaxDrops":40,"minSize":4,"maxRows":24,"maxCols":12}"#,
    );
    let source = ConfigSource::parse(&format!("{base}/config/game-settings.json"));

    let cfg = try_load_config(&source).unwrap();
    assert_eq!(
        cfg,
        GameConfig {
            default_rows: 16,
            default_cols: 8,
            default_max_drops: 40,
            min_size: 4,
            max_rows: 24,
            max_cols: 12,
        }
    );
    server.join().unwrap();
}

#[test]
fn http_error_status_falls_back() {
    let (base, server) = serve_once("HTTP/1.1 404 Not Found", "{}");
    let source = ConfigSource::parse(&format!("{base}/missing.json"));

    assert!(matches!(
        try_load_config(&source),
        Err(ConfigError::Status(404))
    ));
    server.join().unwrap();
}

#[test]
fn unreachable_server_falls_back_to_defaults() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let source = ConfigSource::parse(&format!("http://{addr}/config.json"));
    assert_eq!(load_config(&source), GameConfig::default());
}
