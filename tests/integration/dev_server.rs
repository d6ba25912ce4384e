//! The static development server on a real socket.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use flashpost::error::FpError;
use flashpost::server::{ServerConfig, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn get(port: u16, path: &str) -> String {
    let mut stream = None;
    for _ in 0..50 {
        if let Ok(s) = TcpStream::connect(("127.0.0.1", port)).await {
            stream = Some(s);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let mut stream = stream.expect("server did not start");
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("index.html"), "<h1>carousel</h1>").unwrap();
    std::fs::write(root.path().join("app.js"), "console.log(1)").unwrap();

    let config = ServerConfig {
        root: root.path().to_path_buf(),
        port: free_port(),
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
    };
    let port = config.port;
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        serve(&config, async move {
            let _ = rx.await;
        })
        .await
    });

    let index = get(port, "/").await;
    assert!(index.starts_with("HTTP/1.1 200"), "{index}");
    assert!(index.to_ascii_lowercase().contains("content-type: text/html"));
    assert!(index.contains("<h1>carousel</h1>"));

    let script = get(port, "/app.js").await;
    assert!(script.to_ascii_lowercase().contains("content-type: text/javascript"));

    let missing = get(port, "/nope.css").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");
    assert!(missing.contains("404 Not Found"));

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_port_in_use_is_server_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let root = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        root: root.path().to_path_buf(),
        port: taken.local_addr().unwrap().port(),
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
    };

    let err = serve(&config, std::future::ready(())).await.unwrap_err();
    assert!(matches!(err, FpError::WebServerFailed { .. }));
    assert!(err.suggestion().is_some());
}

#[tokio::test]
async fn test_root_must_be_directory() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = ServerConfig {
        root: file.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let err = serve(&config, std::future::ready(())).await.unwrap_err();
    assert!(matches!(err, FpError::WebServerFailed { ref reason, .. } if reason.contains("not a directory")));
}
