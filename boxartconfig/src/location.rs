//! Recherche du répertoire de configuration

use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Variable d'environnement désignant le répertoire de configuration
pub const ENV_CONFIG_DIR: &str = "BOXART_CONFIG";

/// Nom du répertoire de configuration (courant ou home)
pub const CONFIG_DIR_NAME: &str = ".boxart";

/// Choisit le répertoire candidat, sans toucher au disque sauf pour tester
/// l'existence des emplacements conventionnels
///
/// Ordre : argument explicite, variable d'environnement, `./.boxart`,
/// `~/.boxart`, et enfin `./.boxart` qui sera créé.
pub(crate) fn locate(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.as_os_str().is_empty()) {
        return dir.to_path_buf();
    }

    if let Some(dir) = from_env.filter(|d| !d.as_os_str().is_empty()) {
        info!(env_var = ENV_CONFIG_DIR, path = %dir.display(), "Config directory from environment");
        return dir;
    }

    let local = PathBuf::from(CONFIG_DIR_NAME);
    if local.is_dir() {
        return local;
    }

    if let Some(home_config) = home.map(|h| h.join(CONFIG_DIR_NAME)) {
        if home_config.is_dir() {
            return home_config;
        }
    }

    local
}

/// Crée le répertoire si besoin et vérifie qu'il est lisible et inscriptible
fn prepare(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    if !dir.is_dir() {
        return Err(anyhow!("{} n'est pas un répertoire", dir.display()));
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"test")?;
    fs::remove_file(&probe)?;
    fs::read_dir(dir)?;
    Ok(())
}

/// Détermine et valide le répertoire de configuration
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = locate(
        explicit,
        std::env::var_os(ENV_CONFIG_DIR).map(PathBuf::from),
        dirs::home_dir(),
    );
    prepare(&dir).map_err(|e| anyhow!("Invalid configuration directory {}: {}", dir.display(), e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_directory_wins() {
        let dir = locate(
            Some(Path::new("/etc/boxart")),
            Some(PathBuf::from("/from/env")),
            None,
        );
        assert_eq!(dir, PathBuf::from("/etc/boxart"));
    }

    #[test]
    fn test_environment_before_conventional_locations() {
        let dir = locate(Some(Path::new("")), Some(PathBuf::from("/from/env")), None);
        assert_eq!(dir, PathBuf::from("/from/env"));
    }

    #[test]
    fn test_home_directory_is_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(CONFIG_DIR_NAME)).unwrap();

        let dir = locate(None, None, Some(home.path().to_path_buf()));
        // ./.boxart n'existe pas dans le répertoire de travail des tests
        if !Path::new(CONFIG_DIR_NAME).is_dir() {
            assert_eq!(dir, home.path().join(CONFIG_DIR_NAME));
        }
    }

    #[test]
    fn test_config_dir_is_created() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("nested").join("conf");

        let dir = config_dir(Some(&target)).unwrap();
        assert_eq!(dir, target);
        assert!(target.is_dir());
        assert!(!target.join(".write_test").exists());
    }

    #[test]
    fn test_file_is_not_a_config_dir() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        assert!(config_dir(Some(&file)).is_err());
    }
}
