// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 内存静态资源包后端。
//!
//! 适合把前端构建产物打包进可执行文件后直接提供服务（例如配合
//! `include_bytes!`）。目录项保持添加顺序。

use super::{is_a_directory, not_a_directory, Backend, FileHandle, Metadata};
use crate::util::clean_path;

use async_trait::async_trait;
use bytes::Bytes;

use std::{collections::HashMap, io, time::SystemTime};

#[derive(Debug, Clone)]
struct Node {
    is_dir: bool,
    data: Bytes,
    /// 子项名称，按添加顺序
    children: Vec<String>,
}

/// 内存中的只读文件树。
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    nodes: HashMap<String, Node>,
    modified: SystemTime,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// 只包含根目录的空资源包
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                is_dir: true,
                data: Bytes::new(),
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            modified: SystemTime::now(),
        }
    }

    /// 由 `(路径, 内容)` 列表构建资源包
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<Bytes>,
    {
        let mut backend = Self::new();
        for (path, contents) in files {
            backend.add_file(path.as_ref(), contents);
        }
        backend
    }

    /// 添加文件，缺失的上级目录会自动创建。同名文件会被覆盖。
    pub fn add_file(&mut self, path: &str, contents: impl Into<Bytes>) -> &mut Self {
        let path = clean_path(path);
        if path == "/" {
            return self;
        }
        self.ensure_parent(&path);
        let data = contents.into();
        match self.nodes.get_mut(&path) {
            Some(node) if !node.is_dir => node.data = data,
            Some(_) => {}
            None => {
                self.nodes.insert(
                    path,
                    Node {
                        is_dir: false,
                        data,
                        children: Vec::new(),
                    },
                );
            }
        }
        self
    }

    /// 添加空目录
    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let path = clean_path(path);
        if self.nodes.contains_key(&path) {
            return self;
        }
        self.ensure_parent(&path);
        self.nodes.insert(
            path,
            Node {
                is_dir: true,
                data: Bytes::new(),
                children: Vec::new(),
            },
        );
        self
    }

    fn ensure_parent(&mut self, path: &str) {
        let (parent, name) = split_parent(path);
        if !self.nodes.contains_key(&parent) {
            self.add_dir(&parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            if !node.children.iter().any(|c| c == name) {
                node.children.push(name.to_string());
            }
        }
    }

    fn metadata_of(&self, path: &str, node: &Node) -> Metadata {
        let name = match split_parent(path) {
            (_, "") => "/".to_string(),
            (_, name) => name.to_string(),
        };
        Metadata {
            name,
            is_dir: node.is_dir,
            size: node.data.len() as u64,
            modified: Some(self.modified),
        }
    }
}

/// 拆分规范化路径为父目录与最后一段，根目录的最后一段为空串。
fn split_parent(path: &str) -> (String, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name),
        Some((parent, name)) => (parent.to_string(), name),
        None => ("/".to_string(), path),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileHandle>> {
        let path = clean_path(path);
        let node = match self.nodes.get(&path) {
            Some(node) => node,
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        };
        let entries = node
            .children
            .iter()
            .filter_map(|name| {
                let child_path = if path == "/" {
                    format!("/{}", name)
                } else {
                    format!("{}/{}", path, name)
                };
                self.nodes
                    .get(&child_path)
                    .map(|child| self.metadata_of(&child_path, child))
            })
            .collect();
        Ok(Box::new(MemoryFile {
            metadata: self.metadata_of(&path, node),
            data: node.data.clone(),
            position: 0,
            entries,
            cursor: 0,
        }))
    }
}

struct MemoryFile {
    metadata: Metadata,
    data: Bytes,
    position: usize,
    /// 打开时的目录项快照
    entries: Vec<Metadata>,
    cursor: usize,
}

#[async_trait]
impl FileHandle for MemoryFile {
    async fn stat(&mut self) -> io::Result<Metadata> {
        Ok(self.metadata.clone())
    }

    async fn read_entries(&mut self, n: isize) -> io::Result<Vec<Metadata>> {
        if !self.metadata.is_dir {
            return Err(not_a_directory());
        }
        let remaining = self.entries.len() - self.cursor;
        let take = if n <= 0 {
            remaining
        } else {
            remaining.min(n as usize)
        };
        let page = self.entries[self.cursor..self.cursor + take].to_vec();
        self.cursor += take;
        Ok(page)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.metadata.is_dir {
            return Err(is_a_directory());
        }
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}
