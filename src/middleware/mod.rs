// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 中间件
//!
//! 每个中间件都实现 [`Middleware`](crate::handler::Middleware)，在组合时生成
//! 一个包装了内层处理器的新处理器。除访问日志的输出端与压缩的单次请求编码器
//! 之外，中间件都没有可变状态。

pub mod access_log;
pub mod basic_auth;
pub mod compress;
pub mod cors;
pub mod header;
pub mod no_cache;
pub mod no_dot;

pub use access_log::{AccessLog, LogEntry, LogSink};
pub use basic_auth::{parse_auths, parse_creds, BasicAuth};
pub use compress::Compress;
pub use cors::Cors;
pub use header::{parse_header, CustomHeader};
pub use no_cache::NoCache;
pub use no_dot::NoDot;
