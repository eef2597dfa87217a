//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("No certificates found in {0}")]
    NoCertificates(String),

    #[error("No private key found in {0}")]
    NoPrivateKey(String),
}

/// Load TLS material for the listener.
///
/// The PEM files are checked up front so a bad path or an empty file fails
/// startup with a readable error.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    check_certificates(cert_path)?;
    check_private_key(key_path)?;

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|source| TlsError::Io {
            path: tls.cert_path.clone(),
            source,
        })
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn check_certificates(path: &Path) -> Result<(), TlsError> {
    let mut reader = open(path)?;
    let mut found = false;
    for cert in rustls_pemfile::certs(&mut reader) {
        cert.map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        found = true;
    }
    if found {
        Ok(())
    } else {
        Err(TlsError::NoCertificates(path.display().to_string()))
    }
}

fn check_private_key(path: &Path) -> Result<(), TlsError> {
    let mut reader = open(path)?;
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(TlsError::NoPrivateKey(path.display().to_string())),
        Err(source) => Err(TlsError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
