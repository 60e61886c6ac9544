// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 存储后端抽象
//!
//! 只读的分层文件存储接口。根文件系统包装层（`root` 模块）只依赖这里的
//! trait，从不依赖具体实现。
//!
//! 提供两个实现：
//! - [`DiskBackend`]：以本地目录为根。
//! - [`MemoryBackend`]：内存中的静态资源包，按相同的路径寻址。
//!
//! 文件句柄归打开它的请求独占，离开作用域即释放（`Drop`），错误路径与客户端
//! 提前断开时同样如此；`close` 是显式释放的写法。

use async_trait::async_trait;

use std::io;
use std::time::SystemTime;

mod disk;
mod memory;

pub use disk::DiskBackend;
pub use memory::MemoryBackend;

/// 文件或目录的元数据
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// 最后一个路径段；根目录为 `/`
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// 只读存储后端。
#[async_trait]
pub trait Backend: Send + Sync {
    /// 打开 `/` 开头、已规范化的路径。不存在时返回 `ErrorKind::NotFound`。
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileHandle>>;
}

/// 后端返回的文件句柄。
#[async_trait]
pub trait FileHandle: Send {
    async fn stat(&mut self) -> io::Result<Metadata>;

    /// 分页读取目录项。
    ///
    /// `n > 0` 时最多返回 `n` 项，返回空列表表示已经读完；`n <= 0` 时返回剩余的
    /// 全部目录项。对非目录调用返回错误。
    async fn read_entries(&mut self, n: isize) -> io::Result<Vec<Metadata>>;

    /// 读取文件内容，返回 0 表示读完。
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// 释放句柄。默认实现什么都不做，实际资源在 `Drop` 时释放。
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 对目录调用 `read` 或对文件调用 `read_entries` 时的错误
pub(crate) fn is_a_directory() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "is a directory")
}

pub(crate) fn not_a_directory() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "not a directory")
}
