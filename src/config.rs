// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 运行配置。
//!
//! 先从可选的 TOML 文件读取，再由命令行参数覆盖（见 `cli` 模块）。
//! 文件中缺省的字段使用默认值。

use crate::{
    exception::Exception,
    headers::{is_valid_header_name, is_valid_header_value},
    param::*,
};

use log::warn;
use serde_derive::{Deserialize, Serialize};

use std::{collections::BTreeMap, fs};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    root: String,
    bind: String,
    /// 未设置时 HTTP 使用 8000，HTTPS 使用 8443
    port: Option<u16>,
    https: bool,
    cert: Option<String>,
    key: Option<String>,
    cors: bool,
    no_cache: bool,
    no_dir: bool,
    no_dot: bool,
    auths: Vec<String>,
    headers: BTreeMap<String, String>,
    /// 压缩级别，未设置时不压缩
    compress: Option<i64>,
    index_page: String,
    realm: String,
    worker_threads: usize,
    chunk_size: usize,
    header_timeout_secs: u64,
    max_header_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            root: ".".to_string(),
            bind: "0.0.0.0".to_string(),
            port: None,
            https: false,
            cert: None,
            key: None,
            cors: false,
            no_cache: false,
            no_dir: false,
            no_dot: false,
            auths: Vec::new(),
            headers: BTreeMap::new(),
            compress: None,
            index_page: DEFAULT_INDEX_PAGE.to_string(),
            realm: DEFAULT_REALM.to_string(),
            worker_threads: 0,
            chunk_size: 262144, // 256KB
            header_timeout_secs: 10,
            max_header_bytes: 16384,
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let str_val = fs::read_to_string(filename).map_err(|e| Exception::ConfigFile {
            path: filename.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&str_val).map_err(|reason| Exception::ConfigFile {
            path: filename.to_string(),
            reason,
        })
    }

    pub fn from_toml_str(str_val: &str) -> Result<Self, String> {
        let mut raw_config: Config = toml::from_str(str_val).map_err(|e| e.to_string())?;
        raw_config.normalize();
        Ok(raw_config)
    }

    /// 补全依赖运行环境的默认值
    pub fn normalize(&mut self) {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，将被改为默认值256KB。");
            self.chunk_size = 262144;
        }
        if self.max_header_bytes < 1024 {
            warn!("max_header_bytes过小，将被改为1024。");
            self.max_header_bytes = 1024;
        }
        if self.header_timeout_secs == 0 {
            warn!("header_timeout_secs被设置为0，将被改为10秒。");
            self.header_timeout_secs = 10;
        }
        if self.index_page.is_empty() {
            self.index_page = DEFAULT_INDEX_PAGE.to_string();
        }
    }

    /// 检查无法自动修正的配置项。配置文件里的 `[headers]` 不经过命令行解析，
    /// 在这里与 `--header` 一样校验名称和值。
    pub fn validate(&self) -> Result<(), Exception> {
        for (name, value) in &self.headers {
            if !is_valid_header_name(name) || !is_valid_header_value(value) {
                return Err(Exception::InvalidHeader(format!("{}={}", name, value)));
            }
        }
        Ok(())
    }
}

/// 由命令行覆盖配置项
impl Config {
    pub fn set_root(&mut self, root: String) {
        self.root = root;
    }

    pub fn set_bind(&mut self, bind: String) {
        self.bind = bind;
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    pub fn set_https(&mut self, https: bool) {
        self.https = https;
    }

    pub fn set_cert(&mut self, cert: String) {
        self.cert = Some(cert);
    }

    pub fn set_key(&mut self, key: String) {
        self.key = Some(key);
    }

    pub fn set_cors(&mut self, cors: bool) {
        self.cors = cors;
    }

    pub fn set_no_cache(&mut self, no_cache: bool) {
        self.no_cache = no_cache;
    }

    pub fn set_no_dir(&mut self, no_dir: bool) {
        self.no_dir = no_dir;
    }

    pub fn set_no_dot(&mut self, no_dot: bool) {
        self.no_dot = no_dot;
    }

    pub fn add_auth(&mut self, auth: String) {
        self.auths.push(auth);
    }

    pub fn add_header(&mut self, name: String, value: String) {
        self.headers.insert(name, value);
    }

    pub fn set_compress(&mut self, level: i64) {
        self.compress = Some(level);
    }
}

impl Config {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    /// 实际监听端口
    pub fn port(&self) -> u16 {
        match (self.port, self.https()) {
            (Some(port), _) => port,
            (None, true) => DEFAULT_TLS_PORT,
            (None, false) => DEFAULT_PORT,
        }
    }

    /// 开启 HTTPS，或者同时给出了证书文件
    pub fn https(&self) -> bool {
        self.https || (self.cert.is_some() && self.key.is_some())
    }

    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn cors(&self) -> bool {
        self.cors
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn no_dir(&self) -> bool {
        self.no_dir
    }

    pub fn no_dot(&self) -> bool {
        self.no_dot
    }

    pub fn auths(&self) -> &[String] {
        &self.auths
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn compress(&self) -> Option<i64> {
        self.compress
    }

    pub fn index_page(&self) -> &str {
        &self.index_page
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn header_timeout_secs(&self) -> u64 {
        self.header_timeout_secs
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }
}
