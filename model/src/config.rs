//! The config view external collaborator (spec §1, §4.0, §6). The engine
//! never parses configuration itself — it only reads already-validated,
//! typed values through [`ConfigView`].

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SOCKS-style proxy settings for receive-side connects (spec §4.5, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub address: String,
    pub port: u16,
    pub username: String,
}

/// Read-only typed accessor a host implements to hand the engine its
/// configuration (spec §4.0). Every getter returns an already-validated
/// value; there is no parsing inside the engine.
pub trait ConfigView {
    fn download_path(&self) -> &Path;
    fn upload_path(&self) -> Option<&Path>;
    fn auto_accept_files(&self) -> bool;
    fn auto_accept_chats(&self) -> bool;
    fn auto_resume(&self) -> bool;
    fn auto_rename(&self) -> bool;
    fn convert_spaces(&self) -> bool;
    fn fast_send(&self) -> bool;
    fn blocksize(&self) -> u32;
    fn timeout(&self) -> Option<Duration>;
    fn port_range(&self) -> Option<RangeInclusive<u16>>;
    fn own_ip(&self) -> Option<Ipv4Addr>;
    fn proxy(&self) -> Option<ProxyConfig>;
}

/// Largest block size a worker will read/write per iteration (spec §6).
pub const DCC_MAX_BLOCKSIZE: u32 = 1024 * 1024;

/// TOML-deserializable concrete [`ConfigView`], the shape the `cli` crate
/// loads from disk (SPEC_FULL §1).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DccConfig {
    pub download_path: PathBuf,
    pub upload_path: Option<PathBuf>,
    pub auto_accept_files: bool,
    pub auto_accept_chats: bool,
    pub auto_resume: bool,
    pub auto_rename: bool,
    pub convert_spaces: bool,
    pub fast_send: bool,
    pub blocksize: u32,
    pub timeout_secs: u64,
    pub port_range: Option<String>,
    pub own_ip: Option<String>,
    pub proxy_use: bool,
    pub proxy_address: String,
    pub proxy_port: u16,
    pub proxy_username: String,
}

impl Default for DccConfig {
    fn default() -> Self {
        DccConfig {
            download_path: default_download_path(),
            upload_path: None,
            auto_accept_files: false,
            auto_accept_chats: false,
            auto_resume: true,
            auto_rename: true,
            convert_spaces: false,
            fast_send: false,
            blocksize: 65536,
            timeout_secs: 300,
            port_range: None,
            own_ip: None,
            proxy_use: false,
            proxy_address: String::new(),
            proxy_port: 0,
            proxy_username: String::new(),
        }
    }
}

fn default_download_path() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join("dcc"))
        .unwrap_or_else(|_| PathBuf::from("dcc"))
}

impl DccConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl ConfigView for DccConfig {
    fn download_path(&self) -> &Path {
        &self.download_path
    }

    fn upload_path(&self) -> Option<&Path> {
        self.upload_path.as_deref()
    }

    fn auto_accept_files(&self) -> bool {
        self.auto_accept_files
    }

    fn auto_accept_chats(&self) -> bool {
        self.auto_accept_chats
    }

    fn auto_resume(&self) -> bool {
        self.auto_resume
    }

    fn auto_rename(&self) -> bool {
        self.auto_rename
    }

    fn convert_spaces(&self) -> bool {
        self.convert_spaces
    }

    fn fast_send(&self) -> bool {
        self.fast_send
    }

    fn blocksize(&self) -> u32 {
        self.blocksize.min(DCC_MAX_BLOCKSIZE).max(1)
    }

    fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    fn port_range(&self) -> Option<RangeInclusive<u16>> {
        let spec = self.port_range.as_ref()?;
        match spec.split_once('-') {
            Some((a, b)) => {
                let a: u16 = a.trim().parse().ok()?;
                let b: u16 = b.trim().parse().ok()?;
                Some(a..=b)
            }
            None => {
                let p: u16 = spec.trim().parse().ok()?;
                Some(p..=p)
            }
        }
    }

    fn own_ip(&self) -> Option<Ipv4Addr> {
        self.own_ip.as_ref().and_then(|s| s.parse().ok())
    }

    fn proxy(&self) -> Option<ProxyConfig> {
        if !self.proxy_use {
            return None;
        }
        Some(ProxyConfig {
            address: self.proxy_address.clone(),
            port: self.proxy_port,
            username: self.proxy_username.clone(),
        })
    }
}
