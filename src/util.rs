// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use chrono::{DateTime, Local, Utc};

use crate::fs::Metadata;

/// 目录列表页面构建器。
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    /// 根据目录项生成列表页面。目录排在前面，其余按名称排序。
    pub fn from_dir(path: &str, entries: &mut Vec<Metadata>) -> Self {
        sort_dir_entries(entries);

        let display_path = html_escape(path);
        let mut body = String::new();
        body.push_str(&format!("<h1>Index of {}</h1><hr>", display_path));
        body.push_str("<table>");
        body.push_str(
            r#"
            <tr>
                <td>Name</td>
                <td>Size</td>
                <td>Modified</td>
            </tr>
            "#,
        );
        if path != "/" {
            body.push_str(
                r#"
            <tr>
                <td><a href="../">../</a></td>
                <td></td>
                <td></td>
            </tr>
            "#,
            );
        }
        for entry in entries.iter() {
            let formatted_time = match entry.modified {
                Some(time) => {
                    let local_time: DateTime<Local> = time.into();
                    local_time.format("%Y-%m-%d %H:%M:%S").to_string()
                }
                None => String::new(),
            };
            let (name, size) = if entry.is_dir {
                (format!("{}/", entry.name), "-".to_string())
            } else {
                (entry.name.clone(), format_file_size(entry.size))
            };
            body.push_str(&format!(
                r#"
            <tr>
                <td><a href="{}">{}</a></td>
                <td>{}</td>
                <td>{}</td>
            </tr>
            "#,
                href_for(&name),
                html_escape(&name),
                size,
                formatted_time
            ));
        }
        body.push_str("</table>");
        let css = r"
            table {
                border-collapse: collapse;
            }

            td {
                padding: 4px 16px 4px 0;
                white-space: pre;
            }"
        .to_string();
        HtmlBuilder {
            title: format!("Index of {}", display_path),
            css,
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>"##,
            self.title, self.css, self.body
        )
    }
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

fn sort_dir_entries(entries: &mut [Metadata]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

/// 对链接中的每个路径段做百分号编码，保留目录末尾的 `/`。
fn href_for(name: &str) -> String {
    match name.strip_suffix('/') {
        Some(dir) => format!("{}/", urlencoding::encode(dir)),
        None => urlencoding::encode(name).into_owned(),
    }
}

pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// HTTP 日期格式（IMF-fixdate），例如 `Thu, 01 Jan 1970 00:00:00 GMT`
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// 规范化请求路径：结果总以 `/` 开头，去掉空段和 `.`，`..` 不会越过根目录。
/// 除根目录外不保留末尾的 `/`。
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
