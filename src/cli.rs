// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 命令行参数。命令行中出现的选项覆盖配置文件里的同名配置。

use crate::{config::Config, exception::Exception, middleware::parse_header};

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fileserve")]
#[command(about = "fileserve is a tiny static file server")]
#[command(version)]
#[command(after_help = "Examples:
  serve the current working dir:   fileserve .
  add basic auth:                  fileserve . -a user1:pass1 -a user2:pass2
  add custom http headers:         fileserve . --header Test=ABC --header Foo=Bar
  disable serving of dot files:    fileserve . --no-dot")]
pub struct Cli {
    /// Directory to serve
    pub root: Option<String>,

    /// Bind to a specific interface
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to serve on (8000 by default, 8443 with --https)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serve via HTTPS, with a temporary self-signed certificate unless --cert/--key are given
    #[arg(short = 's', long)]
    pub https: bool,

    /// PEM certificate chain file
    #[arg(long, requires = "key")]
    pub cert: Option<String>,

    /// PEM private key file
    #[arg(long, requires = "cert")]
    pub key: Option<String>,

    /// Allow cross origin requests to be served
    #[arg(long)]
    pub cors: bool,

    /// Disable caching for the file server
    #[arg(long)]
    pub no_cache: bool,

    /// Turn off directory listing
    #[arg(long)]
    pub no_dir: bool,

    /// Disable serving of dot files
    #[arg(long)]
    pub no_dot: bool,

    /// Turn on basic auth with username:password (repeatable)
    #[arg(short, long = "auth", value_name = "USER:PASS")]
    pub auths: Vec<String>,

    /// Add a custom http header as key=value (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Compress responses with gzip/deflate at the given level (0-9)
    #[arg(short, long, allow_negative_numbers = true)]
    pub compress: Option<i64>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// log4rs YAML configuration file
    #[arg(long)]
    pub log_config: Option<String>,
}

impl Cli {
    /// 读取配置文件（如果指定了），再套用命令行选项。
    pub fn load_config(&self) -> Result<Config, Exception> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml(path)?,
            None => Config::new(),
        };
        self.apply(&mut config)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut Config) -> Result<(), Exception> {
        if let Some(root) = &self.root {
            config.set_root(root.clone());
        }
        if let Some(bind) = &self.bind {
            config.set_bind(bind.clone());
        }
        if let Some(port) = self.port {
            config.set_port(port);
        }
        if self.https {
            config.set_https(true);
        }
        if let (Some(cert), Some(key)) = (&self.cert, &self.key) {
            config.set_cert(cert.clone());
            config.set_key(key.clone());
        }
        if self.cors {
            config.set_cors(true);
        }
        if self.no_cache {
            config.set_no_cache(true);
        }
        if self.no_dir {
            config.set_no_dir(true);
        }
        if self.no_dot {
            config.set_no_dot(true);
        }
        for auth in &self.auths {
            config.add_auth(auth.clone());
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            config.add_header(name, value);
        }
        if let Some(level) = self.compress {
            config.set_compress(level);
        }
        Ok(())
    }
}
