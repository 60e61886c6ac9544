// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP Basic 认证
//!
//! 凭据在启动时解析为 `用户名 -> 密码` 表。请求缺少 `Authorization`、格式错误、
//! 用户不存在或密码不匹配时一律返回 401 并附带质询头，请求不会进入内层处理器。
//! 密码比较使用常量时间算法。

use crate::{
    exception::Exception,
    handler::{Handler, Middleware},
    param::DEFAULT_REALM,
    request::Request,
    response::ResponseWriter,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use subtle::ConstantTimeEq;

use std::{collections::HashMap, io, sync::Arc};

/// 解析 `username:password`，必须恰好包含一个冒号。
pub fn parse_creds(creds: &str) -> Result<(String, String), Exception> {
    if !creds.contains(':') {
        return Err(Exception::MissingCredentialSeparator);
    }
    let parts: Vec<&str> = creds.split(':').collect();
    if parts.len() != 2 {
        return Err(Exception::TooManyCredentialParts);
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// 解析多组凭据，同名用户以后出现的为准。
pub fn parse_auths<S: AsRef<str>>(auths: &[S]) -> Result<HashMap<String, String>, Exception> {
    let mut creds = HashMap::new();
    for auth in auths {
        let (user, pass) = parse_creds(auth.as_ref())?;
        creds.insert(user, pass);
    }
    Ok(creds)
}

pub struct BasicAuth {
    realm: Arc<str>,
    creds: Arc<HashMap<String, String>>,
}

impl BasicAuth {
    pub fn new(realm: &str, creds: HashMap<String, String>) -> Self {
        Self {
            realm: Arc::from(realm),
            creds: Arc::new(creds),
        }
    }

    /// 使用默认 realm `restricted`
    pub fn with_creds(creds: HashMap<String, String>) -> Self {
        Self::new(DEFAULT_REALM, creds)
    }
}

impl Middleware for BasicAuth {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(BasicAuthHandler {
            realm: Arc::clone(&self.realm),
            creds: Arc::clone(&self.creds),
            next,
        })
    }
}

struct BasicAuthHandler {
    realm: Arc<str>,
    creds: Arc<HashMap<String, String>>,
    next: Arc<dyn Handler>,
}

/// 从 `Authorization: Basic <base64>` 中取出用户名与密码
fn basic_credentials(req: &Request) -> Option<(String, String)> {
    let value = req.headers().get("Authorization")?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

impl BasicAuthHandler {
    fn authorized(&self, req: &Request) -> bool {
        let (user, pass) = match basic_credentials(req) {
            Some(creds) => creds,
            None => return false,
        };
        match self.creds.get(&user) {
            Some(expected) => bool::from(pass.as_bytes().ct_eq(expected.as_bytes())),
            None => false,
        }
    }
}

#[async_trait]
impl Handler for BasicAuthHandler {
    async fn serve(&self, req: Request, w: &mut dyn ResponseWriter) -> io::Result<()> {
        if self.authorized(&req) {
            debug!("[ID{}]认证通过", req.id());
            return self.next.serve(req, w).await;
        }
        warn!("[ID{}]认证失败：{}", req.id(), req.path());
        let headers = w.headers_mut();
        headers.add("WWW-Authenticate", format!("Basic realm=\"{}\"", self.realm));
        headers.set("Content-Length", "0");
        w.write_head(401).await
    }
}
