// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器
//!
//! 绑定监听地址，可选 TLS，为每个连接启动一个 tokio 任务：读取请求头、解析、
//! 交给组合好的处理器链，最后关闭连接。每个连接只处理一个请求。

use crate::{
    cert,
    config::Config,
    exception::Exception,
    handler::{FileServer, Handler, Middleware},
    middleware::{parse_auths, AccessLog, BasicAuth, Compress, Cors, CustomHeader, NoCache, NoDot},
    param::*,
    request::Request,
    response::{respond_error, ConnectionWriter},
    root::{RootFilesystem, VisibilityPolicy},
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    time::timeout,
};
use tokio_rustls::TlsAcceptor;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

const LINGER_TIMEOUT: Duration = Duration::from_secs(1);

/// 服务器参数
#[derive(Clone)]
pub struct ServerOptions {
    pub bind: String,
    pub port: u16,
    /// 为 `Some` 时以 HTTPS 提供服务
    pub tls: Option<TlsAcceptor>,
    /// 读取请求头（含 TLS 握手）的超时
    pub header_timeout: Duration,
    pub max_header_bytes: usize,
    /// 文件读取的分块大小
    pub chunk_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            header_timeout: Duration::from_secs(10),
            max_header_bytes: 16384,
            chunk_size: 262144,
        }
    }
}

impl ServerOptions {
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

pub struct Server {
    handler: Arc<dyn Handler>,
    options: ServerOptions,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    pub fn new(root: RootFilesystem, options: ServerOptions) -> Self {
        let handler: Arc<dyn Handler> = Arc::new(FileServer::new(root, options.chunk_size));
        Self {
            handler,
            options,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 按配置构建服务器与中间件链。
    ///
    /// 由内到外依次为：点路径拒绝、CORS、自定义头、禁用缓存、压缩、Basic 认证、
    /// 访问日志。访问日志在最外层，能记录包括 401 在内的最终状态码。
    pub fn from_config(config: &Config) -> Result<Self, Exception> {
        config.validate()?;
        let policy = VisibilityPolicy::new(config.no_dot(), config.no_dir())
            .with_index_page(config.index_page());
        let root = RootFilesystem::from_dir(config.root(), policy)?;

        let tls = if config.https() {
            Some(cert::acceptor(config.cert(), config.key())?)
        } else {
            None
        };
        let options = ServerOptions {
            bind: config.bind().to_string(),
            port: config.port(),
            tls,
            header_timeout: Duration::from_secs(config.header_timeout_secs()),
            max_header_bytes: config.max_header_bytes(),
            chunk_size: config.chunk_size(),
        };

        let mut server = Server::new(root, options);
        if config.no_dot() {
            server.use_middleware(NoDot::default());
        }
        if config.cors() {
            server.use_middleware(Cors::default());
        }
        for (name, value) in config.headers() {
            server.use_middleware(CustomHeader::new(name, value));
        }
        if config.no_cache() {
            server.use_middleware(NoCache);
        }
        if let Some(level) = config.compress() {
            server.use_middleware(Compress::new(level));
        }
        if !config.auths().is_empty() {
            let creds = parse_auths(config.auths())?;
            server.use_middleware(BasicAuth::new(config.realm(), creds));
        }
        server.use_middleware(AccessLog::default());
        Ok(server)
    }

    /// 注册中间件，它成为新的最外层。
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.handler = middleware.wrap(Arc::clone(&self.handler));
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }

    /// 当前正在处理的连接数
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// 绑定监听地址并持续服务，直到出错或收到 Ctrl-C。
    pub async fn listen_and_serve(&self) -> Result<(), Exception> {
        let addr = self.options.addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            error!("无法绑定地址：{}，错误：{}", addr, e);
            Exception::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            }
        })?;
        info!("地址{}绑定完成", addr);

        tokio::select! {
            result = self.serve(listener) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("收到停机信号，服务器退出");
                Ok(())
            }
        }
    }

    /// 在已绑定的监听器上接受连接。
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Exception> {
        let mut id: u128 = 0;
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // 文件描述符耗尽等错误不应终止服务器
                    warn!("接受连接失败：{}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };
            debug!("[ID{}]TCP连接已建立：{}", id, addr);

            let handler = Arc::clone(&self.handler);
            let options = self.options.clone();
            let active = Arc::clone(&self.active_connections);
            tokio::spawn(async move {
                active.fetch_add(1, Ordering::SeqCst);
                match &options.tls {
                    Some(acceptor) => {
                        match timeout(options.header_timeout, acceptor.accept(stream)).await {
                            Ok(Ok(tls_stream)) => {
                                handle_connection(tls_stream, addr, id, true, handler, &options)
                                    .await
                            }
                            Ok(Err(e)) => warn!("[ID{}]TLS握手失败：{}", id, e),
                            Err(_) => warn!("[ID{}]TLS握手超时", id),
                        }
                    }
                    None => handle_connection(stream, addr, id, false, handler, &options).await,
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
            id += 1;
        }
    }
}

/// 读取请求头失败的原因
#[derive(Debug)]
enum HeadError {
    /// 客户端没有发送任何数据就关闭了连接
    Closed,
    TooLarge,
    Io(std::io::Error),
}

/// 读取到空行为止，返回包含完整请求头的缓冲区。
async fn read_head<S>(stream: &mut S, max_header_bytes: usize) -> Result<Vec<u8>, HeadError>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.map_err(HeadError::Io)?;
        if n == 0 {
            if buffer.is_empty() {
                return Err(HeadError::Closed);
            }
            // 请求头不完整，交给解析器报告格式错误
            return Ok(buffer);
        }
        // 只需从上一块末尾的 3 个字节开始查找分隔符
        let search_from = buffer.len().saturating_sub(3);
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_head_end(&buffer[search_from..]) {
            buffer.truncate(search_from + pos + 4);
            return Ok(buffer);
        }
        if buffer.len() > max_header_bytes {
            return Err(HeadError::TooLarge);
        }
    }
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

/// # 连接处理器
///
/// 负责单个连接的生命周期：读取并解析请求头、执行处理器链、发送响应并关闭连接。
async fn handle_connection<S>(
    mut stream: S,
    addr: SocketAddr,
    id: u128,
    tls: bool,
    handler: Arc<dyn Handler>,
    options: &ServerOptions,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let head = match timeout(
        options.header_timeout,
        read_head(&mut stream, options.max_header_bytes),
    )
    .await
    {
        Ok(Ok(head)) => head,
        Ok(Err(HeadError::Closed)) => {
            debug!("[ID{}]客户端未发送请求即关闭连接", id);
            return;
        }
        Ok(Err(HeadError::TooLarge)) => {
            warn!("[ID{}]请求头超过{}字节", id, options.max_header_bytes);
            reject(&mut stream, id, &Exception::HeaderTooLarge).await;
            return;
        }
        Ok(Err(HeadError::Io(e))) => {
            error!("[ID{}]读取请求时遇到错误: {}", id, e);
            return;
        }
        Err(_) => {
            warn!("[ID{}]读取请求头超时", id);
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let request = match Request::try_from(&head, id) {
        Ok(request) => request.with_remote_addr(addr).with_tls(tls),
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {}", id, e);
            reject(&mut stream, id, &e).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求：{} {}", id, request.method(), request.path());

    let head_only = request.method() == HttpRequestMethod::Head;
    {
        let mut writer = ConnectionWriter::new(&mut stream, head_only, id);
        let result = match handler.serve(request, &mut writer).await {
            Ok(()) => writer.finish().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!("[ID{}]响应未能完整发送：{}", id, e);
            return;
        }
    }
    if let Err(e) = stream.shutdown().await {
        debug!("[ID{}]关闭连接时遇到错误：{}", id, e);
    }
}

/// 对无法解析的请求直接回应错误并关闭连接
async fn reject<S>(stream: &mut S, id: u128, e: &Exception)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let status = e.status_code();
    let message = format!("{} {}", status, reason_phrase(status));
    let result = {
        let mut writer = ConnectionWriter::new(&mut *stream, false, id);
        match respond_error(&mut writer, status, &message).await {
            Ok(()) => writer.finish().await,
            Err(e) => Err(e),
        }
    };
    if let Err(e) = result {
        debug!("[ID{}]发送错误响应失败：{}", id, e);
        return;
    }
    let _ = stream.shutdown().await;
    linger(stream).await;
}

/// 关闭写端后丢弃客户端尚未发完的数据，避免带着未读数据关闭连接导致对端收到 RST
/// 而丢失错误响应。
async fn linger<S>(stream: &mut S)
where
    S: AsyncRead + Unpin,
{
    let mut discard = [0u8; 4096];
    let drain = async {
        loop {
            match stream.read(&mut discard).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    let _ = timeout(LINGER_TIMEOUT, drain).await;
}
