// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # fileserve 入口
//!
//! 解析命令行与配置文件、初始化日志、按配置的工作线程数构建 tokio 运行时，
//! 然后启动服务器。任何启动阶段的配置错误都会打印到标准错误并以退出码 1 结束。

use fileserve::{cli::Cli, logging, Exception, Server};

use clap::Parser;
use log::{error, info};
use tokio::runtime::Builder;

use std::process;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            // 参数错误与其他启动错误一样以退出码 1 结束
            let _ = e.print();
            process::exit(1);
        }
        // --help 与 --version
        Err(e) => e.exit(),
    };
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Exception> {
    // 1. 配置：配置文件在前，命令行覆盖
    let config = cli.load_config()?;

    // 2. 日志
    logging::init(cli.log_config.as_deref())?;
    info!("配置已载入，工作线程数：{}", config.worker_threads());

    // 3. 按配置的工作线程数构建多线程运行时
    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
        .map_err(|e| Exception::Runtime(e.to_string()))?;

    runtime.block_on(async {
        let server = Server::from_config(&config)?;
        let options = server.options();
        info!(
            "Serving \"{}\" on: {}://{}:{}",
            config.root(),
            options.scheme(),
            options.bind,
            options.port
        );
        server.listen_and_serve().await
    })
}
