// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 压缩中间件
//!
//! 按 `Accept-Encoding` 中第一个可用的编码（`gzip` 或 `deflate`）压缩响应体。
//! 压缩后的长度事先未知，因此去掉 `Content-Length`，由关闭连接标记响应结束。
//! 客户端不接受任何支持的编码时原样转发。

use crate::{
    handler::{Handler, Middleware},
    headers::Headers,
    param::HttpEncoding,
    request::Request,
    response::ResponseWriter,
};

use async_trait::async_trait;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, warn};

use std::{
    io::{self, Write},
    sync::Arc,
};

/// 默认压缩级别
pub const DEFAULT_LEVEL: u32 = 6;

pub struct Compress {
    level: u32,
}

impl Default for Compress {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl Compress {
    /// 级别超出 0..=9 时使用默认级别
    pub fn new(level: i64) -> Self {
        let level = match u32::try_from(level) {
            Ok(level) if level <= 9 => level,
            _ => {
                warn!("压缩级别{}超出范围，使用默认级别{}", level, DEFAULT_LEVEL);
                DEFAULT_LEVEL
            }
        };
        Self { level }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Middleware for Compress {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(CompressHandler {
            level: self.level,
            next,
        })
    }
}

struct CompressHandler {
    level: u32,
    next: Arc<dyn Handler>,
}

/// 选出 `Accept-Encoding` 里第一个支持的编码
fn negotiate(req: &Request) -> Option<HttpEncoding> {
    req.accept_encoding()
        .into_iter()
        .find_map(HttpEncoding::from_token)
}

#[async_trait]
impl Handler for CompressHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        let encoding = match negotiate(&req) {
            Some(encoding) => encoding,
            None => return self.next.serve(req, w).await,
        };
        debug!("[ID{}]使用{}压缩响应", req.id(), encoding);

        let mut writer = CompressWriter::new(w, encoding, Compression::new(self.level));
        let result = self.next.serve(req, &mut writer).await;
        // 内层出错时编码器同样要结束，错误以内层为准
        let finished = writer.finish().await;
        result.and(finished)
    }
}

enum Encoder {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(DeflateEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(encoding: HttpEncoding, level: Compression) -> Self {
        match encoding {
            HttpEncoding::Gzip => Encoder::Gzip(GzEncoder::new(Vec::new(), level)),
            HttpEncoding::Deflate => Encoder::Deflate(DeflateEncoder::new(Vec::new(), level)),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Encoder::Gzip(e) => e.write_all(buf),
            Encoder::Deflate(e) => e.write_all(buf),
        }
    }

    /// 取出目前已经压缩好的字节
    fn drain(&mut self) -> Vec<u8> {
        match self {
            Encoder::Gzip(e) => std::mem::take(e.get_mut()),
            Encoder::Deflate(e) => std::mem::take(e.get_mut()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Gzip(e) => e.flush(),
            Encoder::Deflate(e) => e.flush(),
        }
    }

    fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Encoder::Gzip(e) => e.finish(),
            Encoder::Deflate(e) => e.finish(),
        }
    }
}

/// 压缩响应体后再写给内层 writer。
pub struct CompressWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    encoding: HttpEncoding,
    encoder: Option<Encoder>,
}

impl<'a> CompressWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter, encoding: HttpEncoding, level: Compression) -> Self {
        Self {
            inner,
            encoding,
            encoder: Some(Encoder::new(encoding, level)),
        }
    }

    /// 结束编码器并写出剩余字节，只会生效一次。
    pub async fn finish(&mut self) -> io::Result<()> {
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => return Ok(()),
        };
        let rest = encoder.finish()?;
        if self.inner.status().is_none() {
            self.write_head(200).await?;
        }
        if !rest.is_empty() {
            self.inner.write(&rest).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<'a> ResponseWriter for CompressWriter<'a> {
    fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut Headers {
        self.inner.headers_mut()
    }

    async fn write_head(&mut self, status: u16) -> io::Result<()> {
        if self.inner.status().is_none() {
            let headers = self.inner.headers_mut();
            headers.remove("Content-Length");
            headers.set("Content-Encoding", self.encoding.to_string());
            headers.add("Vary", "Accept-Encoding");
        }
        self.inner.write_head(status).await
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.inner.status().is_none() {
            self.write_head(200).await?;
        }
        let encoder = match self.encoder.as_mut() {
            Some(encoder) => encoder,
            None => return Err(io::Error::new(io::ErrorKind::Other, "compressor already finished")),
        };
        encoder.write_all(buf)?;
        let compressed = encoder.drain();
        if compressed.is_empty() {
            return Ok(());
        }
        self.inner.write(&compressed).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.flush()?;
            let compressed = encoder.drain();
            if !compressed.is_empty() {
                self.inner.write(&compressed).await?;
            }
        }
        self.inner.flush().await
    }

    fn status(&self) -> Option<u16> {
        self.inner.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fs::MemoryBackend,
        handler::FileServer,
        response::ResponseRecorder,
        root::{RootFilesystem, VisibilityPolicy},
    };
    use flate2::read::{DeflateDecoder, GzDecoder};
    use std::io::Read;

    fn fixture() -> Vec<u8> {
        (0..10_000u32).map(|i| (i % 251) as u8).collect()
    }

    fn server() -> Arc<dyn Handler> {
        let backend = MemoryBackend::from_files([("data.bin", fixture())]);
        Arc::new(FileServer::new(
            RootFilesystem::new(backend, VisibilityPolicy::default()),
            1024,
        ))
    }

    async fn get(handler: &Arc<dyn Handler>, accept: Option<&str>) -> ResponseRecorder {
        let mut raw = "GET /data.bin HTTP/1.1\r\nHost: localhost\r\n".to_string();
        if let Some(accept) = accept {
            raw.push_str(&format!("Accept-Encoding: {}\r\n", accept));
        }
        raw.push_str("\r\n");
        let mut rec = ResponseRecorder::new();
        handler
            .serve(Request::try_from(raw.as_bytes(), 0).unwrap(), &mut rec)
            .await
            .unwrap();
        rec
    }

    #[tokio::test]
    async fn test_gzip_round_trip() {
        let handler = Compress::default().wrap(server());
        let rec = get(&handler, Some("gzip")).await;
        assert_eq!(rec.code(), 200);
        let headers = rec.sent_headers();
        assert_eq!(headers.get("Content-Encoding"), Some("gzip"));
        assert_eq!(headers.get("Vary"), Some("Accept-Encoding"));
        assert!(!headers.contains("Content-Length"));

        let mut decoded = Vec::new();
        GzDecoder::new(rec.body()).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, fixture());
    }

    #[tokio::test]
    async fn test_first_supported_token_wins() {
        let handler = Compress::new(9).wrap(server());
        let rec = get(&handler, Some("br, deflate, gzip")).await;
        assert_eq!(rec.sent_headers().get("Content-Encoding"), Some("deflate"));
        let mut decoded = Vec::new();
        DeflateDecoder::new(rec.body()).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, fixture());
    }

    #[tokio::test]
    async fn test_passthrough_without_acceptable_encoding() {
        let handler = Compress::default().wrap(server());
        for accept in [None, Some("br"), Some("identity")] {
            let rec = get(&handler, accept).await;
            assert!(!rec.sent_headers().contains("Content-Encoding"));
            assert_eq!(rec.sent_headers().get("Content-Length"), Some("10000"));
            assert_eq!(rec.body(), fixture().as_slice());
        }
    }

    #[tokio::test]
    async fn test_error_response_is_compressed_consistently() {
        let handler = Compress::default().wrap(server());
        let raw = "GET /missing HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n";
        let mut rec = ResponseRecorder::new();
        handler
            .serve(Request::try_from(raw.as_bytes(), 0).unwrap(), &mut rec)
            .await
            .unwrap();
        assert_eq!(rec.code(), 404);
        assert_eq!(rec.sent_headers().get("Content-Encoding"), Some("gzip"));
        let mut decoded = String::new();
        GzDecoder::new(rec.body()).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "404 page not found\n");
    }

    /// 写出部分响应体后出错的处理器
    struct FailsMidway;

    #[async_trait]
    impl Handler for FailsMidway {
        async fn serve(&self, _req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
            w.write(b"partial body").await?;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "read failed"))
        }
    }

    #[tokio::test]
    async fn test_encoder_finished_when_inner_fails() {
        let handler = Compress::default().wrap(Arc::new(FailsMidway));
        let raw = "GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n";
        let mut rec = ResponseRecorder::new();
        let err = handler
            .serve(Request::try_from(raw.as_bytes(), 0).unwrap(), &mut rec)
            .await
            .err()
            .unwrap();
        // 错误以内层为准
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(rec.sent_headers().get("Content-Encoding"), Some("gzip"));

        // 完整的 gzip 流（含尾部）说明编码器已经结束
        let mut decoded = String::new();
        GzDecoder::new(rec.body()).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "partial body");
    }

    #[test]
    fn test_level_clamp() {
        assert_eq!(Compress::new(-1).level(), DEFAULT_LEVEL);
        assert_eq!(Compress::new(10).level(), DEFAULT_LEVEL);
        assert_eq!(Compress::new(0).level(), 0);
        assert_eq!(Compress::new(9).level(), 9);
    }
}
