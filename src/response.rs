// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应写出模块
//!
//! `ResponseWriter` 是所有处理器与中间件共用的响应输出接口。装饰型中间件
//! （压缩、访问日志）实现同一个接口并转发给被包装的 writer，在转发途中加入
//! 自己的记录或变换。
//!
//! 约束：响应头必须在第一个响应体字节写出之前确定。`write_head` 只生效一次，
//! 之后对 `headers_mut` 的修改不会再被发送。

use crate::{headers::Headers, param::*, util::format_http_date};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use std::io;

/// 响应输出接口。
#[async_trait]
pub trait ResponseWriter: Send {
    /// 尚未发送的响应头
    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    /// 发送状态行与响应头，重复调用会被忽略。
    async fn write_head(&mut self, status: u16) -> io::Result<()>;

    /// 写出响应体。如果响应头尚未发送，先以 200 发送。
    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()>;

    /// 已发送的状态码，尚未发送时为 `None`
    fn status(&self) -> Option<u16>;
}

/// 状态码是否允许携带响应体
pub fn status_allows_body(status: u16) -> bool {
    !(100..200).contains(&status) && status != 204 && status != 304
}

/// 写出纯文本错误响应，并让客户端不要嗅探内容类型。
pub async fn respond_error(
    w: &mut dyn ResponseWriter,
    status: u16,
    message: &str,
) -> io::Result<()> {
    let body = format!("{}\n", message);
    let headers = w.headers_mut();
    headers.remove("Last-Modified");
    headers.remove("Content-Encoding");
    headers.set("Content-Type", "text/plain; charset=utf-8");
    headers.set("X-Content-Type-Options", "nosniff");
    headers.set("Content-Length", body.len().to_string());
    w.write_head(status).await?;
    w.write(body.as_bytes()).await
}

/// 直接写到连接上的 writer。
///
/// 每个连接只处理一个请求（`Connection: close`），因此没有 `Content-Length`
/// 的响应体以关闭连接作为结束标志。
pub struct ConnectionWriter<W> {
    stream: BufWriter<W>,
    headers: Headers,
    status: Option<u16>,
    head_only: bool,
    body_allowed: bool,
    bytes_written: u64,
    id: u128,
}

impl<W> ConnectionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// `head_only` 为 true 时（HEAD 请求）只发送响应头，响应体被丢弃。
    pub fn new(stream: W, head_only: bool, id: u128) -> Self {
        Self {
            stream: BufWriter::new(stream),
            headers: Headers::new(),
            status: None,
            head_only,
            body_allowed: true,
            bytes_written: 0,
            id,
        }
    }

    /// 结束响应：确保响应头已发送并刷新缓冲区。
    pub async fn finish(&mut self) -> io::Result<()> {
        if self.status.is_none() {
            self.write_head(200).await?;
        }
        self.stream.flush().await?;
        debug!(
            "[ID{}]响应发送完毕，响应体 {} bytes",
            self.id, self.bytes_written
        );
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// 按状态码与当前响应头序列化头部，便于单元测试。
    fn serialize_head(&self, status: u16) -> String {
        let mut head = String::new();
        head.push_str(&format!("HTTP/1.1 {} {}{}", status, reason_phrase(status), CRLF));
        if !self.headers.contains("Date") {
            head.push_str(&format!("Date: {}{}", format_http_date(Utc::now()), CRLF));
        }
        if !self.headers.contains("Server") {
            head.push_str(&format!("Server: {}{}", SERVER_NAME, CRLF));
        }
        head.push_str(&format!("Connection: close{}", CRLF));
        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            if !status_allows_body(status) && name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            head.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        head.push_str(CRLF);
        head
    }
}

#[async_trait]
impl<W> ResponseWriter for ConnectionWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    async fn write_head(&mut self, status: u16) -> io::Result<()> {
        if self.status.is_some() {
            debug!("[ID{}]重复的write_head({})被忽略", self.id, status);
            return Ok(());
        }
        self.status = Some(status);
        self.body_allowed = status_allows_body(status);
        let head = self.serialize_head(status);
        self.stream.write_all(head.as_bytes()).await
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.write_head(200).await?;
        }
        if self.head_only || !self.body_allowed || buf.is_empty() {
            return Ok(());
        }
        self.stream.write_all(buf).await?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    fn status(&self) -> Option<u16> {
        self.status
    }
}

/// 在内存中记录响应的 writer，用于测试和基准测试。
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: Headers,
    sent_headers: Option<Headers>,
    status: Option<u16>,
    body: Vec<u8>,
    flushed: bool,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最终状态码，处理器没有写任何内容时视为 200
    pub fn code(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    /// 实际发送出去的响应头（`write_head` 时的快照）
    pub fn sent_headers(&self) -> &Headers {
        self.sent_headers.as_ref().unwrap_or(&self.headers)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn flushed(&self) -> bool {
        self.flushed
    }
}

#[async_trait]
impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    async fn write_head(&mut self, status: u16) -> io::Result<()> {
        if self.status.is_none() {
            self.status = Some(status);
            self.sent_headers = Some(self.headers.clone());
        }
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.write_head(200).await?;
        }
        self.body.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.flushed = true;
        Ok(())
    }

    fn status(&self) -> Option<u16> {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_writer_basic() {
        let mut out = Vec::new();
        {
            let mut w = ConnectionWriter::new(&mut out, false, 0);
            w.headers_mut().set("Content-Type", "text/plain");
            w.headers_mut().set("Content-Length", "5");
            w.write(b"Hello").await.unwrap();
            w.finish().await.unwrap();
            assert_eq!(w.bytes_written(), 5);
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.contains("Server: fileserve\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Date: "));
        assert!(text.ends_with("\r\n\r\nHello"));
    }

    #[tokio::test]
    async fn test_head_only_discards_body() {
        let mut out = Vec::new();
        {
            let mut w = ConnectionWriter::new(&mut out, true, 0);
            w.headers_mut().set("Content-Length", "5");
            w.write(b"Hello").await.unwrap();
            w.finish().await.unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_write_head_only_once() {
        let mut out = Vec::new();
        {
            let mut w = ConnectionWriter::new(&mut out, false, 0);
            w.write_head(404).await.unwrap();
            w.write_head(200).await.unwrap();
            assert_eq!(w.status(), Some(404));
            w.finish().await.unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert_eq!(text.matches("HTTP/1.1").count(), 1);
    }

    #[tokio::test]
    async fn test_no_content_drops_body_and_length() {
        let mut out = Vec::new();
        {
            let mut w = ConnectionWriter::new(&mut out, false, 0);
            w.headers_mut().set("Content-Length", "3");
            w.write_head(204).await.unwrap();
            w.write(b"abc").await.unwrap();
            w.finish().await.unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Content-Length"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_finish_without_writes_sends_200() {
        let mut out = Vec::new();
        {
            let mut w = ConnectionWriter::new(&mut out, false, 0);
            w.finish().await.unwrap();
        }
        assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_respond_error() {
        let mut rec = ResponseRecorder::new();
        respond_error(&mut rec, 404, NOT_FOUND_MESSAGE).await.unwrap();
        assert_eq!(rec.code(), 404);
        assert_eq!(rec.body_string(), "404 page not found\n");
        assert_eq!(
            rec.sent_headers().get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(rec.sent_headers().get("Content-Length"), Some("19"));
    }

    #[tokio::test]
    async fn test_recorder_snapshots_headers_at_write_head() {
        let mut rec = ResponseRecorder::new();
        rec.headers_mut().set("A", "1");
        rec.write_head(200).await.unwrap();
        rec.headers_mut().set("B", "2");
        assert!(rec.sent_headers().contains("A"));
        assert!(!rec.sent_headers().contains("B"));
    }

    #[test]
    fn test_status_allows_body() {
        assert!(status_allows_body(200));
        assert!(status_allows_body(404));
        assert!(!status_allows_body(204));
        assert!(!status_allows_body(304));
        assert!(!status_allows_body(101));
    }
}
