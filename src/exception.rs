// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义 fileserve 在启动阶段与请求解析阶段可能出现的各类异常。
//!
//! - **启动异常**（根目录不可用、凭据格式错误、证书生成失败等）在 `main` 中
//!   统一打印到标准错误并以退出码 1 结束进程，永远不会进入请求处理。
//! - **协议异常**（请求无法解析）只影响当前连接，由服务器转换为 400 响应。
//!
//! 请求处理过程中的文件系统错误使用 `std::io::Error`，由文件服务处理器映射为
//! 404/403/500，不经过本模块。

use std::fmt;

/// fileserve 的异常类型。
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    /// 请求字节流不是合法的 UTF-8。
    RequestIsNotUtf8,
    /// 请求行或请求头格式不正确。
    MalformedRequest,
    /// 无法识别的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求头超过了配置允许的最大长度。
    HeaderTooLarge,
    /// 请求路径无法解码或不以 `/` 开头。
    InvalidPath,
    /// 根目录不可用：不存在、不是目录或没有读取权限。
    CannotServe { dir: String, reason: String },
    /// 凭据中缺少 `:` 分隔符。
    MissingCredentialSeparator,
    /// 凭据中包含多于一个 `:`。
    TooManyCredentialParts,
    /// 自定义响应头不符合 `key=value` 格式或不是合法的头名称。
    InvalidHeader(String),
    /// 配置文件无法读取或解析。
    ConfigFile { path: String, reason: String },
    /// 自签名证书生成失败。
    Certificate(String),
    /// TLS 证书/私钥加载失败。
    Tls(String),
    /// 监听地址绑定失败。
    Bind { addr: String, reason: String },
    /// 日志系统初始化失败。
    Logging(String),
    /// tokio 运行时无法创建。
    Runtime(String),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed HTTP request"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            HeaderTooLarge => write!(f, "Request header too large"),
            InvalidPath => write!(f, "Invalid path (400)"),
            CannotServe { dir, reason } => write!(f, "cannot serve {}: {}", dir, reason),
            MissingCredentialSeparator => write!(
                f,
                "auth must be specified in the format username:password"
            ),
            TooManyCredentialParts => write!(
                f,
                "cannot parse credentials: too many parts, only one colon is allowed"
            ),
            InvalidHeader(header) => write!(
                f,
                "invalid header {:?}: headers must be specified in the format key=value",
                header
            ),
            ConfigFile { path, reason } => {
                write!(f, "cannot load config file {}: {}", path, reason)
            }
            Certificate(reason) => write!(f, "cannot generate certificate: {}", reason),
            Tls(reason) => write!(f, "cannot configure TLS: {}", reason),
            Bind { addr, reason } => write!(f, "cannot listen on {}: {}", addr, reason),
            Logging(reason) => write!(f, "cannot initialize logging: {}", reason),
            Runtime(reason) => write!(f, "cannot start runtime: {}", reason),
        }
    }
}

impl std::error::Error for Exception {}

impl Exception {
    /// 协议异常对应的响应状态码；启动异常不会进入请求处理，统一视为 500。
    pub fn status_code(&self) -> u16 {
        match self {
            HeaderTooLarge => 431,
            UnsupportedHttpVersion => 505,
            UnSupportedRequestMethod => 501,
            RequestIsNotUtf8 | MalformedRequest | InvalidPath => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_messages_are_distinct() {
        let missing = MissingCredentialSeparator.to_string();
        let too_many = TooManyCredentialParts.to_string();
        assert!(missing.contains("username:password"));
        assert!(too_many.contains("too many parts"));
        assert_ne!(missing, too_many);
    }

    #[test]
    fn test_cannot_serve_message() {
        let e = CannotServe {
            dir: "./LICENSE".to_string(),
            reason: "not a directory".to_string(),
        };
        assert_eq!(e.to_string(), "cannot serve ./LICENSE: not a directory");
    }

    #[test]
    fn test_protocol_status_codes() {
        assert_eq!(MalformedRequest.status_code(), 400);
        assert_eq!(HeaderTooLarge.status_code(), 431);
        assert_eq!(UnsupportedHttpVersion.status_code(), 505);
    }
}
