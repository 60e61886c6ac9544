// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # fileserve
//!
//! 面向开发场景的静态文件服务器：
//! - 可见性策略在根文件系统层执行（隐藏点文件、禁用目录列表并回退到首页）。
//! - 访问日志、压缩、禁用缓存、Basic 认证、CORS、自定义响应头以中间件形式
//!   组合，最后注册的位于最外层。
//! - 后端可以是本地目录，也可以是内存资源包。

pub mod cert;
pub mod cli;
pub mod config;
pub mod exception;
pub mod fs;
pub mod handler;
pub mod headers;
pub mod logging;
pub mod middleware;
pub mod param;
pub mod request;
pub mod response;
pub mod root;
pub mod server;
pub mod util;

pub use config::Config;
pub use exception::Exception;
pub use fs::{Backend, DiskBackend, FileHandle, MemoryBackend, Metadata};
pub use handler::{compose, FileServer, Handler, Middleware};
pub use headers::Headers;
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::{ResponseRecorder, ResponseWriter};
pub use root::{RootFilesystem, VisibilityPolicy};
pub use server::{Server, ServerOptions};
pub use util::HtmlBuilder;
