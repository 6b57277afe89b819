//! warden-files — file-backed storage for a playbook working directory.
//!
//! The working directory holds the playbook and everything derived from
//! it:
//!
//! ```text
//! <root>/
//!   templates/            *.tpl template sources (required)
//!   defaults.json         default parameter set (required)
//!   inventories/          one <namespace>.json per managed namespace
//!   configs/<namespace>/  last rendered config set, one file per template
//! ```
//!
//! [`Client::open`] validates the required entries and creates the derived
//! directories, then hands out the repository implementations.

pub mod client;
pub mod configs;
pub mod inventories;
pub mod playbook;

pub use client::Client;
pub use configs::FileConfigs;
pub use inventories::FileInventories;
pub use playbook::FilePlaybook;

use warden_core::{CoreError, CoreResult};

/// Reject namespace values that would escape their directory when used as
/// a file or directory name.
pub(crate) fn safe_name(namespace: &str) -> CoreResult<()> {
    if namespace.is_empty() {
        return Err(CoreError::empty_namespace());
    }
    if namespace == "." || namespace == ".." || namespace.contains(['/', '\\']) {
        return Err(CoreError::Validation(format!(
            "invalid namespace name `{namespace}`"
        )));
    }
    Ok(())
}

pub(crate) fn storage_err(context: &str, err: std::io::Error) -> CoreError {
    CoreError::Storage(format!("{context}: {err}"))
}
