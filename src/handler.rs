// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求处理器与中间件组合
//!
//! - [`Handler`]：处理一次请求，把响应写进 [`ResponseWriter`]。
//! - [`Middleware`]：`Handler -> Handler` 的装饰器，组合时没有副作用。
//! - [`compose`]：按注册顺序逐层包装，最后注册的中间件位于最外层。
//! - [`FileServer`]：最内层的静态文件处理器，经由 [`RootFilesystem`] 访问后端。

use crate::{
    fs::{FileHandle, Metadata},
    param::*,
    request::Request,
    response::{respond_error, ResponseWriter},
    root::{DecoratedFile, RootFilesystem},
    util::{format_http_date, HtmlBuilder},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use std::{io, sync::Arc};

/// 请求处理器。
///
/// 返回的错误只表示响应无法继续写出（例如客户端已断开），
/// 后端错误由处理器自己转换成 HTTP 状态码。
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()>;
}

/// 处理器装饰器。
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

/// 依次用中间件包装处理器。
///
/// `middlewares[0]` 最先包装，位于最内层；最后一个位于最外层，最先看到请求、
/// 最后看到响应。
pub fn compose(handler: Arc<dyn Handler>, middlewares: &[Arc<dyn Middleware>]) -> Arc<dyn Handler> {
    middlewares
        .iter()
        .fold(handler, |inner, middleware| middleware.wrap(inner))
}

/// 静态文件处理器。
pub struct FileServer {
    root: RootFilesystem,
    chunk_size: usize,
}

impl FileServer {
    pub fn new(root: RootFilesystem, chunk_size: usize) -> Self {
        Self {
            root,
            chunk_size: chunk_size.max(1),
        }
    }

    async fn serve_path(&self, req: &Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        let id = req.id();
        let path = req.path();
        let index_suffix = format!("/{}", self.root.policy().index_page());

        // 直接请求首页文件时重定向到所在目录
        if path.ends_with(&index_suffix) {
            return redirect(req, w, "./").await;
        }

        let mut file = match self.root.open(path).await {
            Ok(file) => file,
            Err(e) => return respond_io_error(w, id, path, &e).await,
        };
        let metadata = match file.stat().await {
            Ok(metadata) => metadata,
            Err(e) => return respond_io_error(w, id, path, &e).await,
        };

        if metadata.is_dir {
            if !path.ends_with('/') {
                let location = format!("{}/", base_name(path));
                return redirect(req, w, &location).await;
            }
            let index_path = format!("{}{}", path.trim_end_matches('/'), index_suffix);
            if let Ok(mut index) = self.root.open(&index_path).await {
                match index.stat().await {
                    Ok(index_metadata) if !index_metadata.is_dir => {
                        debug!("[ID{}]以{}代替目录列表", id, index_path);
                        return self.serve_file(req, w, index, index_metadata).await;
                    }
                    _ => {}
                }
            }
            if self.root.policy().hide_dir_listing() {
                // 目录里有名为首页的条目但无法作为文件提供
                return respond_error(w, 404, NOT_FOUND_MESSAGE).await;
            }
            return self.serve_listing(req, w, file).await;
        }

        if path.ends_with('/') {
            let location = format!("../{}", base_name(path));
            return redirect(req, w, &location).await;
        }
        self.serve_file(req, w, file, metadata).await
    }

    async fn serve_file(
        &self,
        req: &Request,
        w: &mut dyn ResponseWriter,
        mut file: DecoratedFile,
        metadata: Metadata,
    ) -> io::Result<()> {
        let headers = w.headers_mut();
        headers.set("Content-Type", mime_for(&metadata.name));
        headers.set("Content-Length", metadata.size.to_string());
        if let Some(modified) = metadata.modified {
            let modified: DateTime<Utc> = modified.into();
            headers.set("Last-Modified", format_http_date(modified));
        }
        w.write_head(200).await?;
        if req.method() == HttpRequestMethod::Head {
            return file.close().await;
        }

        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            w.write(&buffer[..n]).await?;
        }
        debug!("[ID{}]文件{}发送完毕", req.id(), metadata.name);
        file.close().await
    }

    async fn serve_listing(
        &self,
        req: &Request,
        w: &mut dyn ResponseWriter,
        mut dir: DecoratedFile,
    ) -> io::Result<()> {
        let mut entries = match dir.read_entries(-1).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("[ID{}]读取目录{}失败：{}", req.id(), req.path(), e);
                return respond_error(w, 500, "Error reading directory").await;
            }
        };
        let html = HtmlBuilder::from_dir(req.path(), &mut entries).build();
        let headers = w.headers_mut();
        headers.set("Content-Type", "text/html; charset=utf-8");
        headers.set("Content-Length", html.len().to_string());
        w.write_head(200).await?;
        w.write(html.as_bytes()).await?;
        dir.close().await
    }
}

#[async_trait]
impl Handler for FileServer {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        match req.method() {
            HttpRequestMethod::Get | HttpRequestMethod::Head => self.serve_path(&req, w).await,
            HttpRequestMethod::Options => {
                w.headers_mut().set("Allow", allow_header());
                w.write_head(204).await
            }
            method => {
                warn!("[ID{}]拒绝{}请求：{}", req.id(), method, req.path());
                w.headers_mut().set("Allow", allow_header());
                respond_error(w, 405, "405 method not allowed").await
            }
        }
    }
}

fn allow_header() -> String {
    ALLOWED_METHODS
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 路径最后一段（忽略末尾的 `/`），百分号编码后可直接放进 `Location`
fn base_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or_default();
    urlencoding::encode(name).into_owned()
}

/// 301 重定向，保留查询串。
///
/// `location` 总是相对于当前请求的路径，所以 `//host/...` 形式的请求路径
/// 不会被浏览器当成另一台主机。
async fn redirect(req: &Request, w: &mut dyn ResponseWriter, location: &str) -> io::Result<()> {
    let location = match req.query() {
        Some(query) => format!("{}?{}", location, query),
        None => location.to_string(),
    };
    debug!("[ID{}]重定向到{}", req.id(), location);
    let body = format!(
        "<a href=\"{}\">Moved Permanently</a>.\n",
        crate::util::html_escape(&location)
    );
    let headers = w.headers_mut();
    headers.set("Location", location);
    headers.set("Content-Type", "text/html; charset=utf-8");
    headers.set("Content-Length", body.len().to_string());
    w.write_head(301).await?;
    w.write(body.as_bytes()).await
}

/// 把后端错误转换成状态码：不存在为 404，无权限为 403，其余为 500。
async fn respond_io_error(
    w: &mut dyn ResponseWriter,
    id: u128,
    path: &str,
    e: &io::Error,
) -> io::Result<()> {
    match e.kind() {
        io::ErrorKind::NotFound => {
            debug!("[ID{}]{}不存在", id, path);
            respond_error(w, 404, NOT_FOUND_MESSAGE).await
        }
        io::ErrorKind::PermissionDenied => {
            warn!("[ID{}]无权访问{}", id, path);
            respond_error(w, 403, "403 Forbidden").await
        }
        _ => {
            error!("[ID{}]访问{}时遇到错误：{}", id, path, e);
            respond_error(w, 500, "500 Internal Server Error").await
        }
    }
}
