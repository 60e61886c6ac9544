// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 安全回归测试
//!
//! 模拟常见的攻击请求：路径遍历、点文件探测、超长请求头、畸形报文与慢速连接。

mod common;

use common::*;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use std::time::Duration;

#[tokio::test]
async fn test_path_traversal_stays_in_root() {
    let outer = tempfile::tempdir().unwrap();
    std::fs::write(outer.path().join("outside.txt"), "leak").unwrap();
    let inner = outer.path().join("www");
    std::fs::create_dir(&inner).unwrap();
    std::fs::write(inner.join("index.html"), "hi").unwrap();

    let mut config = fileserve::Config::new();
    config.set_root(inner.to_string_lossy().to_string());
    config.normalize();
    let addr = spawn_config(&config).await;

    for path in [
        "/../outside.txt",
        "/../../outside.txt",
        "/%2e%2e/outside.txt",
        "/..%2foutside.txt",
        "/sub/../../outside.txt",
    ] {
        let response = get(addr, path, &[]).await;
        assert_ne!(response.body_string(), "leak", "{}", path);
        assert_ne!(response.status, 200, "{}", path);
    }
}

#[tokio::test]
async fn test_redirect_cannot_point_to_other_host() {
    let dir = site();
    let addr = spawn_config(&config_for(&dir)).await;

    for path in ["//evil.com/index.html", "//evil.com/%2e%2e", "//docs/index.html"] {
        let response = get(addr, path, &[]).await;
        if let Some(location) = response.header("Location") {
            assert!(!location.starts_with("//"), "{} -> {}", path, location);
            assert!(!location.contains("evil.com"), "{} -> {}", path, location);
        }
    }
}

#[tokio::test]
async fn test_dot_file_requests_are_not_found() {
    let dir = site();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git").join("config"), "[core]").unwrap();
    let mut config = config_for(&dir);
    config.set_no_dot(true);
    let addr = spawn_config(&config).await;

    for path in ["/.env", "/.git/config", "/.git/", "/%2Eenv", "/sub/../.env"] {
        let response = get(addr, path, &[]).await;
        assert_eq!(response.status, 404, "{}", path);
        assert!(!response.body_string().contains("secret"));
    }
}

#[tokio::test]
async fn test_oversized_header_rejected() {
    let dir = site();
    let addr = spawn_config(&config_for(&dir)).await;

    let request = format!(
        "GET / HTTP/1.1\r\nHost: localhost\r\nX-Big: {}\r\n\r\n",
        "a".repeat(64 * 1024)
    );
    let raw = send_raw(addr, request.as_bytes()).await;
    let response = parse_response(&raw);
    assert_eq!(response.status, 431);
}

#[tokio::test]
async fn test_malformed_requests() {
    let dir = site();
    let addr = spawn_config(&config_for(&dir)).await;

    let cases: [(&[u8], u16); 5] = [
        (b"GARBAGE\r\n\r\n", 400),
        (b"GET /\r\n\r\n", 400),
        (b"GET / HTTP/2.0\r\n\r\n", 505),
        (b"GET /a%00b HTTP/1.1\r\n\r\n", 400),
        (b"GET / HTTP/1.1\r\nBad Header Line\r\n\r\n", 400),
    ];
    for (request, status) in cases {
        let response = parse_response(&send_raw(addr, request).await);
        assert_eq!(response.status, status, "{}", String::from_utf8_lossy(request));
    }

    let response = parse_response(&send_raw(addr, b"GET / HTTP/1.1\r\nHost: \xff\r\n\r\n").await);
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_slow_client_does_not_block_others() {
    let dir = site();
    let mut config = config_for(&dir);
    config.set_no_dir(true);
    let addr = spawn_config(&config).await;

    // 只发送一半请求头的连接
    let mut slow = TcpStream::connect(addr).await.unwrap();
    slow.write_all(b"GET / HTTP/1.1\r\nHost: local").await.unwrap();

    let response = tokio::time::timeout(Duration::from_secs(3), get(addr, "/", &[]))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body_string(), "hi");
}

#[tokio::test]
async fn test_auth_with_malformed_authorization() {
    let dir = site();
    let mut config = config_for(&dir);
    config.add_auth("admin:s3cret".to_string());
    let addr = spawn_config(&config).await;

    for value in ["Basic", "Basic ====", "Digest abc", "basic YWRtaW46d3Jvbmc="] {
        let response = get(addr, "/", &[("Authorization", value)]).await;
        assert_eq!(response.status, 401, "{}", value);
    }
    // "admin:s3cret"，方案名大小写不敏感
    let response = get(addr, "/", &[("Authorization", "basic YWRtaW46czNjcmV0")]).await;
    assert_eq!(response.status, 200);
}
