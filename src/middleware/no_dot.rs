// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 拒绝点路径：任何以 `.` 开头的路径段直接返回配置的错误，不访问后端。

use crate::{
    handler::{Handler, Middleware},
    param::NOT_FOUND_MESSAGE,
    request::Request,
    response::{respond_error, ResponseWriter},
};

use async_trait::async_trait;
use log::debug;

use std::{io, sync::Arc};

pub struct NoDot {
    message: Arc<str>,
    status: u16,
}

impl Default for NoDot {
    fn default() -> Self {
        Self::new(NOT_FOUND_MESSAGE, 404)
    }
}

impl NoDot {
    pub fn new(message: &str, status: u16) -> Self {
        Self {
            message: Arc::from(message),
            status,
        }
    }
}

impl Middleware for NoDot {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(NoDotHandler {
            message: Arc::clone(&self.message),
            status: self.status,
            next,
        })
    }
}

struct NoDotHandler {
    message: Arc<str>,
    status: u16,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for NoDotHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        if req.path().split('/').any(|part| part.starts_with('.')) {
            debug!("[ID{}]拒绝点路径：{}", req.id(), req.path());
            return respond_error(w, self.status, &self.message).await;
        }
        self.next.serve(req, w).await
    }
}
