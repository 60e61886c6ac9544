// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 访问日志中间件。
//!
//! 请求进入时记录方法、协议、主机、URI 与对端地址，响应结束后追加最终状态码，
//! 每个请求输出一行：
//!
//! ```text
//! "GET http://localhost:8000/index.html HTTP/1.1" from 127.0.0.1:52100 - 200
//! ```

use crate::{
    handler::{Handler, Middleware},
    request::Request,
    response::ResponseWriter,
};

use async_trait::async_trait;
use log::info;

use std::{fmt, io, net::SocketAddr, sync::Arc};

/// 访问日志的输出端，进程内共享、只写。
pub trait LogSink: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// 默认输出端：通过 `log` 门面以 `fileserve::access` 为 target 输出。
#[derive(Debug, Default)]
pub struct LogFacadeSink;

impl LogSink for LogFacadeSink {
    fn log(&self, entry: &LogEntry) {
        info!(target: "fileserve::access", "{}", entry);
    }
}

/// 一条访问日志。
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub method: String,
    pub scheme: &'static str,
    pub host: String,
    pub uri: String,
    pub proto: String,
    pub remote_addr: Option<SocketAddr>,
    /// 响应没有发出任何状态行时为 0
    pub status: u16,
}

impl LogEntry {
    fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().to_string(),
            scheme: req.scheme(),
            host: req.host().to_string(),
            uri: req.target().to_string(),
            proto: req.version().to_string(),
            remote_addr: req.remote_addr(),
            status: 0,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = match self.remote_addr {
            Some(addr) => addr.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "\"{} {}://{}{} {}\" from {} - {:03}",
            self.method, self.scheme, self.host, self.uri, self.proto, addr, self.status
        )
    }
}

/// 访问日志中间件
pub struct AccessLog {
    sink: Arc<dyn LogSink>,
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new(Arc::new(LogFacadeSink))
    }
}

impl AccessLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

impl Middleware for AccessLog {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(AccessLogHandler {
            sink: Arc::clone(&self.sink),
            next,
        })
    }
}

struct AccessLogHandler {
    sink: Arc<dyn LogSink>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for AccessLogHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        let mut entry = LogEntry::from_request(&req);
        let result = self.next.serve(req, w).await;
        entry.status = match (w.status(), &result) {
            (Some(status), _) => status,
            // 内层什么都没写就正常返回时，连接层会补发 200
            (None, Ok(())) => 200,
            (None, Err(_)) => 0,
        };
        self.sink.log(&entry);
        result
    }
}
