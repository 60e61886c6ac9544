// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试公共工具：在临时目录上启动服务器，并通过原始 TCP 连接发送请求。

#![allow(dead_code)]

use fileserve::{Config, Server};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use std::net::SocketAddr;
use std::time::Duration;

/// 一次原始 HTTP 响应
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// 测试站点：`{index.html: "hi", .env: "secret", sub/: {a.txt: "A"}}`，
/// 另有带首页的 `docs/`、空目录 `empty/` 和 10000 字节的 `data.bin`。
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("index.html"), "hi").unwrap();
    std::fs::write(root.join(".env"), "secret").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::fs::write(root.join("sub").join("a.txt"), "A").unwrap();
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
    std::fs::create_dir(root.join("empty")).unwrap();
    std::fs::write(root.join("data.bin"), fixture()).unwrap();
    dir
}

pub fn fixture() -> Vec<u8> {
    (0..10_000u32).map(|i| (i % 251) as u8).collect()
}

pub fn config_for(dir: &TempDir) -> Config {
    let mut config = Config::new();
    config.set_root(dir.path().to_string_lossy().to_string());
    config.normalize();
    config
}

/// 在 127.0.0.1 的随机端口上启动服务器
pub async fn spawn(server: Server) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

pub async fn spawn_config(config: &Config) -> SocketAddr {
    spawn(Server::from_config(config).unwrap()).await
}

/// 发送原始请求，读取到连接关闭为止
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

pub fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).to_string();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RawResponse {
        status,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}

/// 发送带额外请求头的 GET 请求
pub async fn get(addr: SocketAddr, path: &str, extra_headers: &[(&str, &str)]) -> RawResponse {
    request(addr, "GET", path, extra_headers).await
}

pub async fn request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> RawResponse {
    let mut raw = format!("{} {} HTTP/1.1\r\nHost: localhost\r\n", method, path);
    for (name, value) in extra_headers {
        raw.push_str(&format!("{}: {}\r\n", name, value));
    }
    raw.push_str("\r\n");
    parse_response(&send_raw(addr, raw.as_bytes()).await)
}
