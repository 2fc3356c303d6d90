//! Inspect or create the configuration file.

use std::path::{Path, PathBuf};

use panelfeed_common::{config_file_path, AppConfig};

pub fn show(config: &AppConfig, path: Option<&Path>) -> anyhow::Result<()> {
    let path = resolve_path(path);
    let origin = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{origin}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = resolve_path(path);
    if target.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            target.display()
        );
    }

    let path = match path {
        Some(path) => {
            AppConfig::default().save_to(path)?;
            path.to_path_buf()
        }
        None => AppConfig::default().save()?,
    };
    println!("Wrote default config to {}", path.display());
    println!("  Set serial.port to your panel controller (see `panelfeed ports`).");
    Ok(())
}

fn resolve_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panelfeed/config.json");

        init(Some(&path), false).unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());

        assert!(init(Some(&path), false).is_err());
        init(Some(&path), true).unwrap();
    }
}
