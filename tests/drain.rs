//! Graceful shutdown tests: the balancer stops accepting immediately
//! and drains in-flight connections instead of severing them.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tcp_balancer::load_balancer::BalancerError;

mod common;

#[tokio::test]
async fn stop_with_no_connections_returns_quickly() {
    let backend: SocketAddr = "127.0.0.1:28891".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28890".parse().unwrap();

    common::start_echo_backend(backend).await;
    let lb = common::spawn_balancer(proxy.port(), &["127.0.0.1:28891"]).await;

    let start = Instant::now();
    lb.stop().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn stop_waits_for_inflight_connections() {
    let backend: SocketAddr = "127.0.0.1:28991".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28990".parse().unwrap();

    common::start_echo_backend(backend).await;
    let lb = common::spawn_balancer(proxy.port(), &["127.0.0.1:28991"]).await;

    let mut conn = TcpStream::connect(proxy).await.unwrap();
    conn.write_all(b"hold").await.unwrap();
    let mut reply = [0u8; 4];
    conn.read_exact(&mut reply).await.unwrap();

    // The client hangs up a beat after stop() starts waiting.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(conn);
    });

    let start = Instant::now();
    lb.stop().await.unwrap();
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(100), "stop returned before the drain: {waited:?}");
    assert!(waited < Duration::from_secs(5));
}

#[tokio::test]
async fn stop_times_out_when_a_connection_is_held_open() {
    let backend: SocketAddr = "127.0.0.1:29091".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29090".parse().unwrap();

    common::start_echo_backend(backend).await;
    let mut config = common::config_for(proxy.port(), &["127.0.0.1:29091"]);
    config.listener.max_drain_wait_secs = 1;
    let lb = common::spawn_balancer_with_config(config).await;

    let mut conn = TcpStream::connect(proxy).await.unwrap();
    conn.write_all(b"linger").await.unwrap();
    let mut reply = [0u8; 6];
    conn.read_exact(&mut reply).await.unwrap();

    // The connection outlives the drain bound.
    let err = lb.stop().await.unwrap_err();
    assert!(matches!(err, BalancerError::DrainTimeout(_)));
    drop(conn);
}

#[tokio::test]
async fn no_connections_are_accepted_after_stop() {
    let backend: SocketAddr = "127.0.0.1:29191".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29190".parse().unwrap();

    common::start_echo_backend(backend).await;
    let lb = common::spawn_balancer(proxy.port(), &["127.0.0.1:29191"]).await;

    lb.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The listening socket is gone; a connect either fails outright or
    // is torn down without ever being served.
    match TcpStream::connect(proxy).await {
        Err(_) => {}
        Ok(mut conn) => {
            let mut buf = [0u8; 1];
            match conn.read(&mut buf).await {
                Ok(0) | Err(_) => {}
                Ok(n) => panic!("connection was served after stop ({n} bytes)"),
            }
        }
    }
}
