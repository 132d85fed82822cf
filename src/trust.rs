//! Pinned certificate trust bundle
//!
//! The provider omits its intermediate certificates from the TLS handshake,
//! so the default trust store cannot build a chain. The missing root and
//! intermediate certificates ship as a PEM bundle that is loaded once per
//! process and shared read-only between login flows.

use crate::error::{HydroError, Result};
use crate::logging::get_logger;
use std::path::{Path, PathBuf};

/// Certificates parsed from a PEM bundle file
#[derive(Debug, Clone)]
pub struct TrustBundle {
    path: PathBuf,
    certificates: Vec<reqwest::Certificate>,
}

impl TrustBundle {
    /// Read and parse a PEM bundle from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            HydroError::trust(format!(
                "Cannot read certificate bundle {}: {}",
                path.display(),
                e
            ))
        })?;
        let bundle = Self::from_pem(&pem, path.to_path_buf())?;
        get_logger("trust").info(&format!(
            "Loaded {} pinned certificate(s) from {}",
            bundle.len(),
            path.display()
        ));
        Ok(bundle)
    }

    /// Parse an in-memory PEM bundle; `origin` is only used in messages
    pub fn from_pem(pem: &[u8], origin: PathBuf) -> Result<Self> {
        let certificates = reqwest::Certificate::from_pem_bundle(pem).map_err(|e| {
            HydroError::trust(format!(
                "Invalid certificate bundle {}: {}",
                origin.display(),
                e
            ))
        })?;
        if certificates.is_empty() {
            return Err(HydroError::trust(format!(
                "Certificate bundle {} contains no certificates",
                origin.display()
            )));
        }
        Ok(Self {
            path: origin,
            certificates,
        })
    }

    /// Path the bundle was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Register every certificate as an extra root on a client builder
    pub fn apply(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        self.certificates
            .iter()
            .cloned()
            .fold(builder, |b, cert| b.add_root_certificate(cert))
    }
}
