// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 禁用缓存中间件：去掉条件请求头，并让客户端与反向代理都不要缓存响应。

use crate::{
    handler::{Handler, Middleware},
    request::Request,
    response::ResponseWriter,
    util::format_http_date,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

use std::{io, sync::Arc, time::SystemTime};

/// 请求中需要去掉的校验相关头
const ETAG_HEADERS: [&str; 6] = [
    "ETag",
    "If-Modified-Since",
    "If-Match",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
];

lazy_static! {
    static ref NO_CACHE_HEADERS: Vec<(&'static str, String)> = {
        let epoch: DateTime<Utc> = SystemTime::UNIX_EPOCH.into();
        vec![
            ("Expires", format_http_date(epoch)),
            ("Cache-Control", "no-cache, private, max-age=0".to_string()),
            ("Pragma", "no-cache".to_string()),
            ("X-Accel-Expires", "0".to_string()),
        ]
    };
}

#[derive(Debug, Default)]
pub struct NoCache;

impl Middleware for NoCache {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(NoCacheHandler { next })
    }
}

struct NoCacheHandler {
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for NoCacheHandler {
    async fn serve(&self, mut req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        for name in ETAG_HEADERS {
            req.headers_mut().remove(name);
        }
        for (name, value) in NO_CACHE_HEADERS.iter() {
            w.headers_mut().set(name, value.clone());
        }
        self.next.serve(req, w).await
    }
}
