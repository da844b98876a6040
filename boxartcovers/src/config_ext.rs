//! Extension pour intégrer le résolveur de couvertures dans boxartconfig
//!
//! Ce module fournit le trait `CoverConfigExt` qui ajoute à
//! `boxartconfig::Config` les réglages du moteur de couvertures.

use crate::resolver::{CoverResolver, ResolverBuilder};
use crate::store::LocalStore;
use anyhow::Result;
use boxartconfig::{Config, keys};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_COVERS_DIR: &str = "cache_covers";

/// Trait d'extension pour gérer le résolveur de couvertures dans boxartconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use boxartconfig::get_config;
/// use boxartcovers::CoverConfigExt;
///
/// let config = get_config();
/// let resolver = config.create_cover_resolver()?;
/// let cover = resolver.resolve(&item).await;
/// ```
pub trait CoverConfigExt {
    /// Récupère le répertoire du cache de couvertures
    ///
    /// Le chemin absolu du répertoire (default: "cache_covers", relatif au
    /// répertoire de configuration)
    fn get_covers_dir(&self) -> Result<PathBuf>;

    /// Définit le répertoire du cache de couvertures
    fn set_covers_dir(&self, directory: String) -> Result<()>;

    /// Délai maximal d'une recherche distante
    fn get_covers_fetch_timeout(&self) -> Result<Duration>;

    /// Stockage local, avec la racine de contenu configurée si elle existe
    fn create_cover_store(&self) -> Result<LocalStore>;

    /// Builder pré-rempli avec la configuration
    fn cover_resolver_builder(&self) -> Result<ResolverBuilder>;

    /// Crée une instance du résolveur configurée
    ///
    /// Répertoire de cache, gabarit d'URL, délai et activation du réseau
    /// viennent tous de la configuration.
    fn create_cover_resolver(&self) -> Result<Arc<CoverResolver>>;
}

impl CoverConfigExt for Config {
    fn get_covers_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(keys::COVERS_DIRECTORY, DEFAULT_COVERS_DIR)
    }

    fn set_covers_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(keys::COVERS_DIRECTORY, directory)
    }

    fn get_covers_fetch_timeout(&self) -> Result<Duration> {
        Ok(Duration::from_secs(self.get_cover_fetch_timeout_secs()?))
    }

    fn create_cover_store(&self) -> Result<LocalStore> {
        let root = self.get_content_root()?;
        if root.trim().is_empty() {
            Ok(LocalStore::new())
        } else {
            Ok(LocalStore::with_content_root(root))
        }
    }

    fn cover_resolver_builder(&self) -> Result<ResolverBuilder> {
        Ok(CoverResolver::builder(self.get_covers_dir()?)
            .store(Arc::new(self.create_cover_store()?))
            .lookup_url(self.get_cover_lookup_url()?)
            .remote_enabled(self.get_use_game_covers()?)
            .fetch_timeout(self.get_covers_fetch_timeout()?))
    }

    fn create_cover_resolver(&self) -> Result<Arc<CoverResolver>> {
        Ok(Arc::new(self.cover_resolver_builder()?.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_follows_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(Some(dir.path())).unwrap();
        config.set_use_game_covers(false).unwrap();
        config.set_covers_dir("my_covers".to_string()).unwrap();

        let resolver = config.create_cover_resolver().unwrap();
        assert!(!resolver.remote_enabled());
        assert_eq!(resolver.covers_dir(), dir.path().join("my_covers"));
        assert!(dir.path().join("my_covers").is_dir());
    }

    #[test]
    fn test_content_root_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(Some(dir.path())).unwrap();
        assert!(config.create_cover_store().unwrap().content_root().is_none());

        config.set_content_root("/mnt/content".to_string()).unwrap();
        let store = config.create_cover_store().unwrap();
        assert_eq!(
            store.content_root(),
            Some(std::path::Path::new("/mnt/content"))
        );
    }
}
