//! Process configuration.
//!
//! Settings are resolved in one place, with flags beating environment
//! variables beating `warden.toml` beating defaults. Nothing below the
//! binary reads the environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8400;

/// Environment variable names recognized by the binary.
pub const ENV_ROOT: &str = "WARDEN_ROOT";
pub const ENV_CONTEXT: &str = "WARDEN_CONTEXT";
pub const ENV_PORT: &str = "WARDEN_PORT";

/// Optional config file, looked up in the playbook root.
const CONFIG_FILE: &str = "warden.toml";

/// Resolved process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Playbook working directory.
    pub root: PathBuf,
    /// Kubeconfig context override; `None` uses the ambient configuration.
    pub context: Option<String>,
    /// Listen port for `serve`.
    pub port: u16,
    /// Permissive CORS on `serve`.
    pub cors: bool,
}

/// `warden.toml` shape. Every field is optional; absent fields fall
/// through to environment and defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    root: Option<PathBuf>,
    context: Option<String>,
    port: Option<u16>,
    cors: Option<bool>,
}

impl ConfigFile {
    fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

impl Settings {
    /// Resolve settings from command-line flags (highest precedence), the
    /// environment, and `warden.toml` in the playbook root.
    pub fn resolve(
        root_flag: Option<PathBuf>,
        context_flag: Option<String>,
        port_flag: Option<u16>,
        cors_flag: bool,
    ) -> anyhow::Result<Self> {
        let root = root_flag
            .or_else(|| std::env::var_os(ENV_ROOT).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let file = ConfigFile::load(&root)?;
        let root = file.root.unwrap_or(root);

        let context = context_flag
            .or_else(|| std::env::var(ENV_CONTEXT).ok())
            .or(file.context);

        let port = match port_flag {
            Some(port) => port,
            None => match std::env::var(ENV_PORT) {
                Ok(raw) => raw
                    .parse()
                    .with_context(|| format!("invalid {ENV_PORT} value `{raw}`"))?,
                Err(_) => file.port.unwrap_or(DEFAULT_PORT),
            },
        };

        Ok(Self {
            root,
            context,
            port,
            cors: cors_flag || file.cors.unwrap_or(false),
        })
    }
}
