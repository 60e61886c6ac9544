// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # TLS 证书
//!
//! 两种来源：
//! - 用户提供的 PEM 证书链与私钥文件。
//! - 启动时生成的临时自签名证书，覆盖本机常见的访问名称。
//!
//! 两种来源最终都经过同一段 PEM 解析得到 rustls 的 `ServerConfig`。

use crate::exception::Exception;

use log::{debug, info};
use rcgen::{generate_simple_self_signed, CertifiedKey};
use rustls::{
    pki_types::{CertificateDer, PrivateKeyDer},
    ServerConfig,
};
use tokio_rustls::TlsAcceptor;

use std::{io::BufReader, sync::Arc};

/// 自签名证书的主体备用名称。
///
/// 总是包含 `localhost` 与 `127.0.0.1`；能取得主机名时再加上主机名及其
/// `.local`、`.lan`、`.home` 变体（含通配符）。
pub fn sans() -> Vec<String> {
    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    sans_for(Some(hostname.as_str()).filter(|h| !h.is_empty()))
}

pub fn sans_for(hostname: Option<&str>) -> Vec<String> {
    let mut result = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    if let Some(host) = hostname {
        let host = host.to_lowercase();
        result.push(host.clone());
        for suffix in ["local", "lan", "home"] {
            result.push(format!("{}.{}", host, suffix));
            result.push(format!("*.{}.{}", host, suffix));
        }
    }
    result
}

/// PEM 格式的证书与私钥
#[derive(Debug, Clone)]
pub struct PemPair {
    pub cert: String,
    pub key: String,
}

/// 生成自签名证书。IP 形式的名称写入 IP SAN，其余作为 DNS 名称（小写）。
pub fn self_signed(sans: &[String]) -> Result<PemPair, Exception> {
    let names: Vec<String> = sans.iter().map(|san| san.to_lowercase()).collect();
    debug!("自签名证书SAN：{:?}", names);
    let CertifiedKey { cert, key_pair } =
        generate_simple_self_signed(names).map_err(|e| Exception::Certificate(e.to_string()))?;
    Ok(PemPair {
        cert: cert.pem(),
        key: key_pair.serialize_pem(),
    })
}

/// 读取证书链与私钥文件
pub fn load_pem_files(cert_path: &str, key_path: &str) -> Result<PemPair, Exception> {
    let read = |path: &str| {
        std::fs::read_to_string(path).map_err(|e| Exception::Tls(format!("{}: {}", path, e)))
    };
    Ok(PemPair {
        cert: read(cert_path)?,
        key: read(key_path)?,
    })
}

/// 由 PEM 构建 rustls 服务端配置（TLS 1.2 及以上）
pub fn server_config(pem: &PemPair) -> Result<ServerConfig, Exception> {
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut BufReader::new(pem.cert.as_bytes()))
            .collect::<Result<_, _>>()
            .map_err(|e| Exception::Tls(format!("invalid certificate: {}", e)))?;
    if certs.is_empty() {
        return Err(Exception::Tls("no certificate found".to_string()));
    }
    let key: PrivateKeyDer<'static> =
        match rustls_pemfile::private_key(&mut BufReader::new(pem.key.as_bytes())) {
            Ok(Some(key)) => key,
            Ok(None) => return Err(Exception::Tls("no private key found".to_string())),
            Err(e) => return Err(Exception::Tls(format!("invalid private key: {}", e))),
        };

    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| Exception::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Exception::Tls(e.to_string()))
}

/// 按配置得到 TLS acceptor：提供了证书文件就使用文件，否则生成自签名证书。
pub fn acceptor(cert: Option<&str>, key: Option<&str>) -> Result<TlsAcceptor, Exception> {
    let pem = match (cert, key) {
        (Some(cert), Some(key)) => {
            info!("使用证书文件：{}，私钥：{}", cert, key);
            load_pem_files(cert, key)?
        }
        (None, None) => {
            info!("生成临时自签名证书");
            self_signed(&sans())?
        }
        _ => {
            return Err(Exception::Tls(
                "certificate and key must be given together".to_string(),
            ))
        }
    };
    Ok(TlsAcceptor::from(Arc::new(server_config(&pem)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sans_with_hostname() {
        assert_eq!(
            sans_for(Some("MyBox")),
            vec![
                "localhost",
                "127.0.0.1",
                "mybox",
                "mybox.local",
                "*.mybox.local",
                "mybox.lan",
                "*.mybox.lan",
                "mybox.home",
                "*.mybox.home",
            ]
        );
    }

    #[test]
    fn test_sans_without_hostname() {
        assert_eq!(sans_for(None), vec!["localhost", "127.0.0.1"]);
    }

    #[test]
    fn test_self_signed_builds_server_config() {
        let pem = self_signed(&sans_for(Some("devbox"))).unwrap();
        assert!(pem.cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(pem.key.contains("PRIVATE KEY"));
        assert!(server_config(&pem).is_ok());
    }

    #[test]
    fn test_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let pem = self_signed(&sans_for(None)).unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, &pem.cert).unwrap();
        std::fs::write(&key_path, &pem.key).unwrap();

        let loaded = load_pem_files(
            &cert_path.to_string_lossy(),
            &key_path.to_string_lossy(),
        )
        .unwrap();
        assert!(server_config(&loaded).is_ok());

        assert!(load_pem_files("/nonexistent/cert.pem", "/nonexistent/key.pem").is_err());
    }

    #[test]
    fn test_mismatched_pem_rejected() {
        let pem = PemPair {
            cert: "not a certificate".to_string(),
            key: String::new(),
        };
        assert!(matches!(server_config(&pem), Err(Exception::Tls(_))));
    }

    #[test]
    fn test_cert_without_key_rejected() {
        assert!(acceptor(Some("cert.pem"), None).is_err());
    }
}
