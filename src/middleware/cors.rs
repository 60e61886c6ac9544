// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{
    handler::{Handler, Middleware},
    request::Request,
    response::ResponseWriter,
};

use async_trait::async_trait;

use std::{io, sync::Arc};

/// 设置 `Access-Control-Allow-Origin`，命令行开启时为 `*`。
pub struct Cors {
    origin: Arc<str>,
}

impl Default for Cors {
    fn default() -> Self {
        Self::new("*")
    }
}

impl Cors {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: Arc::from(origin),
        }
    }
}

impl Middleware for Cors {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(CorsHandler {
            origin: Arc::clone(&self.origin),
            next,
        })
    }
}

struct CorsHandler {
    origin: Arc<str>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for CorsHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        w.headers_mut()
            .set("Access-Control-Allow-Origin", self.origin.to_string());
        self.next.serve(req, w).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{respond_error, ResponseRecorder};

    struct NotFound;

    #[async_trait]
    impl Handler for NotFound {
        async fn serve(&self, _req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
            respond_error(w, 404, "gone").await
        }
    }

    #[tokio::test]
    async fn test_origin_header_survives_error_responses() {
        let handler = Cors::default().wrap(Arc::new(NotFound));
        let req = Request::try_from(b"GET /x HTTP/1.1\r\n\r\n", 0).unwrap();
        let mut rec = ResponseRecorder::new();
        handler.serve(req, &mut rec).await.unwrap();
        assert_eq!(rec.code(), 404);
        assert_eq!(
            rec.sent_headers().get("Access-Control-Allow-Origin"),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_specific_origin() {
        let handler = Cors::new("https://example.com").wrap(Arc::new(NotFound));
        let req = Request::try_from(b"GET / HTTP/1.1\r\n\r\n", 0).unwrap();
        let mut rec = ResponseRecorder::new();
        handler.serve(req, &mut rec).await.unwrap();
        assert_eq!(
            rec.sent_headers().get("Access-Control-Allow-Origin"),
            Some("https://example.com")
        );
    }
}
