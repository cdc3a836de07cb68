//
//  atlassian-operations
//  config/file.rs
//
//  Created by Ngonidzashe Mangudya on 2026/10/19.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration File I/O
//!
//! Low-level helpers used by [`ProviderConfig`](super::ProviderConfig).
//! The file holds an API token, so writes restrict it to the owner on Unix.

use std::path::Path;

use super::ConfigError;

/// Reads the raw file content.
pub fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `content`, creating parent directories first.
pub fn write_config_file(path: &Path, content: &str) -> Result<(), ConfigError> {
    let io = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(io)?;
        // The creation mode does not apply to a file that already exists.
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(io)?;
        file.write_all(content.as_bytes()).map_err(io)?;
    }
    #[cfg(not(unix))]
    std::fs::write(path, content).map_err(io)?;

    Ok(())
}

pub fn config_exists(path: &Path) -> bool {
    path.exists()
}
