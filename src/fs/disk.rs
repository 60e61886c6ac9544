// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 本地磁盘后端，基于 `tokio::fs`。

use super::{is_a_directory, not_a_directory, Backend, FileHandle, Metadata};
use crate::util::clean_path;

use async_trait::async_trait;
use log::debug;
use tokio::{
    fs::{self, File, ReadDir},
    io::AsyncReadExt,
};

use std::{
    io,
    path::{Path, PathBuf},
};

/// 以本地目录为根的后端。请求路径先规范化，不会越出根目录。
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let cleaned = clean_path(path);
        let relative = cleaned.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

#[async_trait]
impl Backend for DiskBackend {
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileHandle>> {
        let full_path = self.resolve(path);
        debug!("映射物理路径：{}", full_path.display());
        let metadata = fs::metadata(&full_path).await?;
        let name = match path.trim_end_matches('/').rsplit('/').next() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => "/".to_string(),
        };
        let kind = if metadata.is_dir() {
            DiskKind::Dir(None)
        } else {
            DiskKind::File(File::open(&full_path).await?)
        };
        Ok(Box::new(DiskFile {
            path: full_path,
            name,
            kind,
        }))
    }
}

enum DiskKind {
    File(File),
    /// 第一次枚举时才打开目录流
    Dir(Option<ReadDir>),
}

struct DiskFile {
    path: PathBuf,
    name: String,
    kind: DiskKind,
}

fn to_metadata(name: String, metadata: &std::fs::Metadata) -> Metadata {
    Metadata {
        name,
        is_dir: metadata.is_dir(),
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified: metadata.modified().ok(),
    }
}

#[async_trait]
impl FileHandle for DiskFile {
    async fn stat(&mut self) -> io::Result<Metadata> {
        let metadata = match &self.kind {
            DiskKind::File(file) => file.metadata().await?,
            DiskKind::Dir(_) => fs::metadata(&self.path).await?,
        };
        Ok(to_metadata(self.name.clone(), &metadata))
    }

    async fn read_entries(&mut self, n: isize) -> io::Result<Vec<Metadata>> {
        let read_dir = match &mut self.kind {
            DiskKind::File(_) => return Err(not_a_directory()),
            DiskKind::Dir(stream) => {
                if stream.is_none() {
                    *stream = Some(fs::read_dir(&self.path).await?);
                }
                match stream.as_mut() {
                    Some(s) => s,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let mut entries = Vec::new();
        while n <= 0 || entries.len() < n as usize {
            let entry = match read_dir.next_entry().await? {
                Some(entry) => entry,
                None => break,
            };
            let name = entry.file_name().to_string_lossy().to_string();
            // 跟随符号链接；目标不存在时退回链接本身的元数据
            let metadata = match fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(_) => entry.metadata().await?,
            };
            entries.push(to_metadata(name, &metadata));
        }
        Ok(entries)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.kind {
            DiskKind::File(file) => file.read(buf).await,
            DiskKind::Dir(_) => Err(is_a_directory()),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        if let DiskKind::Dir(stream) = &mut self.kind {
            stream.take();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), "BB").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_open_file_and_read() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let mut file = backend.open("/sub/b.txt").await.unwrap();
        let meta = file.stat().await.unwrap();
        assert_eq!(meta.name, "b.txt");
        assert!(!meta.is_dir);
        assert_eq!(meta.size, 2);

        let mut buf = [0u8; 16];
        let n = file.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"BB");
        assert_eq!(file.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_root_metadata_name() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let mut root = backend.open("/").await.unwrap();
        let meta = root.stat().await.unwrap();
        assert_eq!(meta.name, "/");
        assert!(meta.is_dir);
    }

    #[tokio::test]
    async fn test_paginated_entries_end_with_empty_page() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let mut root = backend.open("/").await.unwrap();

        let mut names = Vec::new();
        loop {
            let page = root.read_entries(1).await.unwrap();
            if page.is_empty() {
                break;
            }
            assert_eq!(page.len(), 1);
            names.push(page[0].name.clone());
        }
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_read_all_entries() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let mut root = backend.open("/").await.unwrap();
        assert_eq!(root.read_entries(-1).await.unwrap().len(), 2);
        assert!(root.read_entries(-1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let err = backend.open("/nope.txt").await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_root() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path().join("sub"));
        // "/../a.txt" 规范化为 "/a.txt"，在 sub 下不存在
        let err = backend.open("/../a.txt").await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_read_entries_on_file_fails() {
        let dir = fixture();
        let backend = DiskBackend::new(dir.path());
        let mut file = backend.open("/a.txt").await.unwrap();
        assert!(file.read_entries(1).await.is_err());
    }
}
