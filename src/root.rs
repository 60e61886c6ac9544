// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 根文件系统包装层
//!
//! 在存储后端之上施加可见性策略：
//! - **隐藏点文件**：名称以 `.` 开头的路径段既不能直接打开，也不会出现在目录
//!   枚举结果里。
//! - **禁用目录列表**：对目录调用 `stat` 时，只有目录中存在首页文件才返回目录
//!   自身的元数据（文件服务处理器会继续去打开首页），否则返回 NotFound，
//!   处理器因此回应 404 而不是生成目录列表。
//!
//! 策略在文件系统边界执行，所有经由 `RootFilesystem` 访问后端的调用方都受同样
//! 的约束，文件服务处理器本身不感知策略。

use crate::{
    exception::Exception,
    fs::{Backend, DiskBackend, FileHandle, Metadata},
    param::DEFAULT_INDEX_PAGE,
    util::clean_path,
};

use async_trait::async_trait;
use log::{debug, warn};

use std::{io, sync::Arc};

/// 可见性策略，创建后不再修改，所有请求共享只读引用。
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityPolicy {
    hide_dot_files: bool,
    hide_dir_listing: bool,
    index_page: String,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl VisibilityPolicy {
    pub fn new(hide_dot_files: bool, hide_dir_listing: bool) -> Self {
        Self {
            hide_dot_files,
            hide_dir_listing,
            index_page: DEFAULT_INDEX_PAGE.to_string(),
        }
    }

    /// 替换首页文件名（默认 `index.html`）。空名称或包含 `/` 的名称被忽略。
    pub fn with_index_page(mut self, index_page: impl Into<String>) -> Self {
        let index_page = index_page.into();
        if index_page.is_empty() || index_page.contains('/') {
            warn!("首页文件名{:?}无效，继续使用{}", index_page, self.index_page);
        } else {
            self.index_page = index_page;
        }
        self
    }

    pub fn hide_dot_files(&self) -> bool {
        self.hide_dot_files
    }

    pub fn hide_dir_listing(&self) -> bool {
        self.hide_dir_listing
    }

    pub fn index_page(&self) -> &str {
        &self.index_page
    }
}

/// 带可见性策略的根文件系统。
///
/// 除了后端与策略的共享引用外没有任何状态，克隆代价很低。
#[derive(Clone)]
pub struct RootFilesystem {
    backend: Arc<dyn Backend>,
    policy: Arc<VisibilityPolicy>,
}

impl RootFilesystem {
    /// 包装任意后端，例如内存资源包。
    pub fn new<B: Backend + 'static>(backend: B, policy: VisibilityPolicy) -> Self {
        Self {
            backend: Arc::new(backend),
            policy: Arc::new(policy),
        }
    }

    /// 以本地目录为根。目录必须存在、是目录且可以打开，否则返回启动异常。
    pub fn from_dir(dir: &str, policy: VisibilityPolicy) -> Result<Self, Exception> {
        let cannot_serve = |reason: String| Exception::CannotServe {
            dir: dir.to_string(),
            reason,
        };
        let metadata = std::fs::metadata(dir).map_err(|e| cannot_serve(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(cannot_serve("not a directory".to_string()));
        }
        std::fs::read_dir(dir).map_err(|e| cannot_serve(e.to_string()))?;
        Ok(Self::new(DiskBackend::new(dir), policy))
    }

    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    /// 打开路径，返回施加了策略的文件句柄。
    ///
    /// 隐藏点文件时，任何以 `.` 开头的路径段都按不存在处理，不会访问后端。
    pub async fn open(&self, path: &str) -> io::Result<DecoratedFile> {
        let cleaned = clean_path(path);
        if self.policy.hide_dot_files && has_dot_segment(&cleaned) {
            debug!("路径{}包含点文件段，按不存在处理", cleaned);
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        let inner = self.backend.open(&cleaned).await?;
        Ok(DecoratedFile::new(inner, Arc::clone(&self.policy)))
    }
}

/// 路径中是否有以 `.` 开头的段
pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// 施加了可见性策略的文件句柄，随请求创建，由文件服务处理器释放。
pub struct DecoratedFile {
    inner: Box<dyn FileHandle>,
    policy: Arc<VisibilityPolicy>,
}

impl DecoratedFile {
    fn new(inner: Box<dyn FileHandle>, policy: Arc<VisibilityPolicy>) -> Self {
        Self { inner, policy }
    }

    /// 逐项扫描目录，寻找首页文件。
    ///
    /// 找到时返回目录自身的元数据；枚举结束仍未找到时返回 NotFound；
    /// 其他枚举错误原样返回。扫描会消耗该句柄的目录枚举进度。
    async fn find_index_page(&mut self, dir: Metadata) -> io::Result<Metadata> {
        loop {
            let page = self.inner.read_entries(1).await?;
            if page.is_empty() {
                debug!("目录{}中没有{}，隐藏目录列表", dir.name, self.policy.index_page);
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            if page.iter().any(|entry| entry.name == self.policy.index_page) {
                return Ok(dir);
            }
        }
    }
}

#[async_trait]
impl FileHandle for DecoratedFile {
    async fn stat(&mut self) -> io::Result<Metadata> {
        let metadata = self.inner.stat().await?;
        if !metadata.is_dir || !self.policy.hide_dir_listing {
            return Ok(metadata);
        }
        self.find_index_page(metadata).await
    }

    async fn read_entries(&mut self, n: isize) -> io::Result<Vec<Metadata>> {
        if !self.policy.hide_dot_files {
            return self.inner.read_entries(n).await;
        }
        loop {
            let page = self.inner.read_entries(n).await?;
            let exhausted = page.is_empty();
            let filtered: Vec<Metadata> = page
                .into_iter()
                .filter(|entry| !entry.name.starts_with('.'))
                .collect();
            // 分页读取时整页都被过滤掉不能返回空列表，否则调用方会误以为已经读完
            if !filtered.is_empty() || exhausted || n <= 0 {
                return Ok(filtered);
            }
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.close().await
    }
}
