// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 日志初始化：优先使用 log4rs 的 YAML 配置文件，找不到时退回到内置的控制台输出。

use crate::exception::Exception;

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};

use std::path::Path;

/// 默认的日志配置文件位置
pub const DEFAULT_LOG_CONFIG: &str = "config/log4rs.yaml";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}";

/// 初始化全局日志。
///
/// 显式指定的文件必须存在且合法；未指定时如果默认位置存在配置文件就使用它，
/// 否则以 info 级别输出到控制台。
pub fn init(path: Option<&str>) -> Result<(), Exception> {
    let file = match path {
        Some(path) => Some(path),
        None if Path::new(DEFAULT_LOG_CONFIG).exists() => Some(DEFAULT_LOG_CONFIG),
        None => None,
    };
    match file {
        Some(file) => log4rs::init_file(file, Default::default())
            .map_err(|e| Exception::Logging(format!("{}: {}", file, e))),
        None => {
            let config = console_config(LevelFilter::Info)?;
            log4rs::init_config(config)
                .map(|_| ())
                .map_err(|e| Exception::Logging(e.to_string()))
        }
    }
}

/// 控制台输出配置，访问日志单独使用一个 logger 便于按 target 调整级别
pub fn console_config(level: LevelFilter) -> Result<LogConfig, Exception> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("fileserve::access", LevelFilter::Info))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| Exception::Logging(e.to_string()))
}
