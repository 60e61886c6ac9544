// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 自定义响应头。每个 `--header K=V` 注册为一层中间件。

use crate::{
    exception::Exception,
    handler::{Handler, Middleware},
    headers::{is_valid_header_name, is_valid_header_value},
    request::Request,
    response::ResponseWriter,
};

use async_trait::async_trait;

use std::{io, sync::Arc};

/// 解析 `key=value`。值可以为空，也可以包含 `=`。
pub fn parse_header(raw: &str) -> Result<(String, String), Exception> {
    let (name, value) = match raw.split_once('=') {
        Some(pair) => pair,
        None => return Err(Exception::InvalidHeader(raw.to_string())),
    };
    let name = name.trim();
    if !is_valid_header_name(name) || !is_valid_header_value(value) {
        return Err(Exception::InvalidHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}

pub struct CustomHeader {
    name: Arc<str>,
    value: Arc<str>,
}

impl CustomHeader {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: Arc::from(name),
            value: Arc::from(value),
        }
    }
}

impl Middleware for CustomHeader {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(CustomHeaderHandler {
            name: Arc::clone(&self.name),
            value: Arc::clone(&self.value),
            next,
        })
    }
}

struct CustomHeaderHandler {
    name: Arc<str>,
    value: Arc<str>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for CustomHeaderHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        w.headers_mut().set(&self.name, self.value.to_string());
        self.next.serve(req, w).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::compose;
    use crate::response::ResponseRecorder;

    struct Empty;

    #[async_trait]
    impl Handler for Empty {
        async fn serve(&self, _req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
            w.write(b"").await
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Test=ABC").unwrap(),
            ("Test".to_string(), "ABC".to_string())
        );
        assert_eq!(
            parse_header("X-Token=a=b").unwrap(),
            ("X-Token".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_header("X-Empty=").unwrap().1, "");
        assert!(parse_header("NoEquals").is_err());
        assert!(parse_header("Bad Name=1").is_err());
        assert!(parse_header("X=line\r\nInjected: 1").is_err());
    }

    #[tokio::test]
    async fn test_headers_applied() {
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(CustomHeader::new("Test", "ABC")),
            Arc::new(CustomHeader::new("Foo", "Bar")),
        ];
        let handler = compose(Arc::new(Empty), &middlewares);
        let req = Request::try_from(b"GET / HTTP/1.1\r\n\r\n", 0).unwrap();
        let mut rec = ResponseRecorder::new();
        handler.serve(req, &mut rec).await.unwrap();
        assert_eq!(rec.sent_headers().get("Test"), Some("ABC"));
        assert_eq!(rec.sent_headers().get("Foo"), Some("Bar"));
    }
}
