//! Dérivation de la clé de cache et construction du plan de repli
//!
//! Fonctions pures : aucune entrée/sortie, aucune erreur possible.

use crate::item::LibraryItem;
use crate::source::{CoverSource, FallbackPlan};
use sha1::{Digest, Sha1};
use std::fmt;
use std::path::{Path, PathBuf};

/// Régions de secours essayées après la région propre de l'élément
///
/// Le service de couvertures a une collection quasi complète pour `US` et `EN`.
pub const FALLBACK_REGIONS: [&str; 2] = ["US", "EN"];

/// Extension des couvertures mises en cache
pub const COVER_EXTENSION: &str = "png";

/// Clé déterministe d'une couverture
///
/// Sert à la fois de nom de fichier dans le cache et de clé de recherche.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoverKey(String);

impl CoverKey {
    /// Dérive la clé d'un élément de bibliothèque
    ///
    /// L'identifiant de titre est utilisé tel quel s'il ne contient que des
    /// caractères sûrs pour un nom de fichier ; sinon la clé est le SHA1
    /// tronqué (16 octets, 32 caractères hex) du chemin de l'élément.
    pub fn for_item(item: &LibraryItem) -> Self {
        if is_safe_key(&item.title_id) {
            return CoverKey(item.title_id.clone());
        }
        CoverKey(digest_key(&item.path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nom du fichier de cache : `{key}.png`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, COVER_EXTENSION)
    }
}

impl fmt::Display for CoverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CoverKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_safe_key(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn digest_key(identifier: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(identifier.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Calcule la clé et le plan de repli d'un élément
#[derive(Debug, Clone)]
pub struct KeyResolver {
    covers_dir: PathBuf,
    remote_enabled: bool,
}

impl KeyResolver {
    pub fn new(covers_dir: impl Into<PathBuf>, remote_enabled: bool) -> Self {
        Self {
            covers_dir: covers_dir.into(),
            remote_enabled,
        }
    }

    pub fn covers_dir(&self) -> &Path {
        &self.covers_dir
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote_enabled
    }

    /// Chemin du fichier de cache d'une clé
    pub fn cache_path(&self, key: &CoverKey) -> PathBuf {
        self.covers_dir.join(key.file_name())
    }

    /// Construit `(clé, plan)` pour un élément
    ///
    /// Ordre : couverture utilisateur (si une référence existe), cache local,
    /// puis région de l'élément, `US` et `EN`. La séquence distante est gardée
    /// telle quelle même si la région de l'élément vaut déjà `US` ou `EN`.
    pub fn resolve(&self, item: &LibraryItem) -> (CoverKey, FallbackPlan) {
        let key = CoverKey::for_item(item);

        let mut sources = Vec::with_capacity(5);
        if let Some(reference) = item.override_reference() {
            sources.push(CoverSource::UserOverride(reference));
        }
        sources.push(CoverSource::LocalCache(self.cache_path(&key)));

        if self.remote_enabled {
            sources.push(CoverSource::Remote(item.region.clone()));
            for region in FALLBACK_REGIONS {
                sources.push(CoverSource::Remote(region.to_string()));
            }
        }

        (key, FallbackPlan::new(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_uses_title_id() {
        let item = LibraryItem::new("/games/Zelda.iso", "GZLE01", "US");
        assert_eq!(CoverKey::for_item(&item).as_str(), "GZLE01");
        assert_eq!(CoverKey::for_item(&item).file_name(), "GZLE01.png");
    }

    #[test]
    fn test_key_falls_back_to_path_digest() {
        let a = LibraryItem::new("/games/a.iso", "", "US");
        let b = LibraryItem::new("/games/b.iso", "../etc", "US");

        let ka = CoverKey::for_item(&a);
        let kb = CoverKey::for_item(&b);
        assert_eq!(ka.as_str().len(), 32);
        assert_ne!(ka, kb);
        // Stable d'un appel (et d'un processus) à l'autre
        assert_eq!(ka, CoverKey::for_item(&a.clone()));
    }

    #[test]
    fn test_plan_order() {
        let resolver = KeyResolver::new("/cache/covers", true);
        let item = LibraryItem::new("/games/Zelda.iso", "GZLE01", "JA");
        let (key, plan) = resolver.resolve(&item);

        assert_eq!(key.as_str(), "GZLE01");
        let sources: Vec<_> = plan.iter().cloned().collect();
        assert_eq!(
            sources,
            vec![
                CoverSource::UserOverride("/games/Zelda.cover.png".into()),
                CoverSource::LocalCache(PathBuf::from("/cache/covers/GZLE01.png")),
                CoverSource::Remote("JA".into()),
                CoverSource::Remote("US".into()),
                CoverSource::Remote("EN".into()),
            ]
        );
    }

    #[test]
    fn test_plan_keeps_redundant_region() {
        let resolver = KeyResolver::new("/cache", true);
        let item = LibraryItem::new("/games/Mario.iso", "RMCE01", "US");
        let (_, plan) = resolver.resolve(&item);
        assert_eq!(plan.remote_regions(), vec!["US", "US", "EN"]);
    }

    #[test]
    fn test_plan_without_remote() {
        let resolver = KeyResolver::new("/cache", false);
        let item = LibraryItem::new("/games/Mario.iso", "RMCE01", "US");
        let (_, plan) = resolver.resolve(&item);
        assert_eq!(plan.len(), 2);
        assert!(plan.remote_regions().is_empty());
    }
}
