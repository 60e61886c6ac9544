// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 将从连接中读取到的请求头字节解析为强类型的 `Request`：
//! 1. 请求行（方法、请求目标、版本）。
//! 2. 全部请求头，保留顺序，名称大小写不敏感。
//! 3. 请求目标拆分为解码后的路径与原始查询串。
//!
//! 服务器只处理只读请求，不读取请求体。

use crate::{exception::Exception, headers::Headers, param::*};
use log::error;
use std::net::SocketAddr;

/// 一次 HTTP 请求的元数据。
///
/// 中间件按值接收 `Request`，可以在转发给内层处理器之前修改请求头。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 原始请求目标，例如 `/docs/a%20b.txt?x=1`
    target: String,
    /// 解码后的路径部分
    path: String,
    query: Option<String>,
    version: HttpVersion,
    headers: Headers,
    remote_addr: Option<SocketAddr>,
    tls: bool,
    /// 连接序号，仅用于日志
    id: u128,
}

impl Request {
    /// 从请求头字节构建 `Request`。
    ///
    /// `buffer` 只需包含请求行和请求头（到空行为止），多余的字节会被忽略。
    /// `id` 是连接序号，仅用于日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let head = match request_string.split_once("\r\n\r\n") {
            Some((head, _)) => head,
            None => request_string,
        };
        let mut request_lines = head.split(CRLF);

        // 1. 请求行，例如 "GET /index.html HTTP/1.1"
        let request_line = request_lines.next().unwrap_or("");
        let first_line_parts: Vec<&str> = request_line.split(' ').collect();
        if first_line_parts.len() != 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequest);
        }

        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "DELETE" => HttpRequestMethod::Delete,
            "PATCH" => HttpRequestMethod::Patch,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[2].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        let target = first_line_parts[1].to_string();
        let (path, query) = split_target(&target, id)?;

        // 2. 请求头
        let mut headers = Headers::new();
        for line in request_lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = match line.split_once(':') {
                Some(pair) => pair,
                None => {
                    error!("[ID{}]无法解析的请求头：{}", id, line);
                    return Err(Exception::MalformedRequest);
                }
            };
            let name = name.trim();
            if !crate::headers::is_valid_header_name(name) {
                error!("[ID{}]非法的请求头名称：{}", id, name);
                return Err(Exception::MalformedRequest);
            }
            headers.add(name, value.trim());
        }

        Ok(Self {
            method,
            target,
            path,
            query,
            version,
            headers,
            remote_addr: None,
            tls: false,
            id,
        })
    }

    /// 记录对端地址，由服务器在接受连接后设置。
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// 标记请求来自 TLS 连接。
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

/// 拆分请求目标为解码后的路径与查询串。
fn split_target(target: &str, id: u128) -> Result<(String, Option<String>), Exception> {
    if target == "*" {
        return Ok(("*".to_string(), None));
    }
    let (raw_path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (target, None),
    };
    if !raw_path.starts_with('/') {
        error!("[ID{}]请求路径必须以/开头：{}", id, target);
        return Err(Exception::InvalidPath);
    }
    match urlencoding::decode(raw_path) {
        Ok(decoded) => {
            if decoded.contains('\0') {
                error!("[ID{}]请求路径包含空字节：{}", id, target);
                return Err(Exception::InvalidPath);
            }
            Ok((decoded.into_owned(), query))
        }
        Err(_) => {
            error!("[ID{}]请求路径无法解码为UTF-8：{}", id, target);
            Err(Exception::InvalidPath)
        }
    }
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 原始请求目标（含查询串），访问日志使用
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 解码后的请求路径，不含查询串
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 未解码的路径部分，重定向时原样拼接
    pub fn raw_path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn host(&self) -> &str {
        self.headers.get("Host").unwrap_or("")
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// `Accept-Encoding` 中的编码 token，按出现顺序排列。
    ///
    /// 参数（如 `;q=0.5`）会被去掉，`q=0` 的编码视为客户端明确拒绝而跳过。
    pub fn accept_encoding(&self) -> Vec<&str> {
        let mut tokens = Vec::new();
        for value in self.headers.get_all("Accept-Encoding") {
            for part in value.split(',') {
                let mut pieces = part.split(';');
                let token = pieces.next().unwrap_or("").trim();
                let rejected = pieces.any(|p| {
                    let p = p.trim();
                    p == "q=0" || p == "q=0.0" || p == "q=0.00" || p == "q=0.000"
                });
                if !token.is_empty() && !rejected {
                    tokens.push(token);
                }
            }
        }
        tokens
    }
}
