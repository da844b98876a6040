//! # boxartcovers - Résolution des couvertures de jeux pour BoxArt
//!
//! Cette crate trouve l'image de couverture d'un élément de bibliothèque en
//! privilégiant les sources locales, puis en interrogeant un service de
//! couvertures distant région par région. Toute couverture obtenue à
//! distance est écrite dans un cache persistant pour que les résolutions
//! suivantes n'aient plus besoin du réseau.
//!
//! ## Ordre de repli
//!
//! ```text
//! couverture utilisateur ──▶ cache local ──▶ région de l'élément ──▶ US ──▶ EN ──▶ placeholder
//! ```
//!
//! La première source qui aboutit gagne. L'appel public ne retourne jamais
//! d'erreur : au pire, il rend le placeholder.
//!
//! ## Architecture
//!
//! ```text
//! boxartcovers
//!     ├── item.rs      - Éléments de bibliothèque, codes de région
//!     ├── key.rs       - Clé de cache et plan de repli (pur)
//!     ├── store.rs     - Stockage local / handles de contenu
//!     ├── probe.rs     - Sonde des sources locales
//!     ├── fetch.rs     - Client du service distant
//!     ├── cache.rs     - Cache d'écriture différée
//!     └── resolver.rs  - Machine à états de repli
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use boxartcovers::{CoverResolver, LibraryItem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = CoverResolver::builder("./cache_covers").build()?;
//!     let item = LibraryItem::new("/games/Zelda.iso", "GZLE01", "US");
//!
//!     let cover = resolver.resolve(&item).await;
//!     println!("{} octets ({})", cover.len(), cover.provenance);
//!     Ok(())
//! }
//! ```
//!
//! ### Exemple avec configuration automatique
//!
//! ```rust,no_run
//! use boxartconfig::get_config;
//! use boxartcovers::CoverConfigExt;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let resolver = get_config().create_cover_resolver()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod item;
pub mod key;
pub mod probe;
pub mod resolver;
pub mod source;
pub mod store;

#[cfg(feature = "boxartconfig")]
pub mod config_ext;

pub use cache::{CoverCache, TEMP_FILE_GRACE};
pub use decode::{CoverDecoder, CoverInfo, ImageDecoder, placeholder};
pub use error::{CacheError, DecodeError, FetchError, ProbeMiss};
pub use fetch::{ClientBuilder, CoverFetcher, GameTdbClient, build_lookup_url};
pub use item::{Country, DiscRegion, LibraryItem, lookup_region};
pub use key::{CoverKey, KeyResolver};
pub use probe::LocalProbe;
pub use resolver::{CoverResolver, Resolution, ResolverBuilder, new_resolver_with_consolidation};
pub use source::{CoverArtifact, CoverSource, FallbackPlan, Provenance};
pub use store::{CoverStore, LocalStore, StoredFile, is_temp_file};

#[cfg(feature = "boxartconfig")]
pub use config_ext::CoverConfigExt;

// ============================================================================
// Registre global singleton
// ============================================================================

use once_cell::sync::OnceCell;
use std::sync::Arc;

static COVER_RESOLVER: OnceCell<Arc<CoverResolver>> = OnceCell::new();

/// Enregistre le résolveur de couvertures global
///
/// # Behavior
///
/// - Si appelée plusieurs fois, seul le premier appel prend effet
/// - Thread-safe: peut être appelée depuis plusieurs threads simultanément
/// - Une fois enregistré, le résolveur est accessible via [`get_cover_resolver`]
pub fn register_cover_resolver(resolver: Arc<CoverResolver>) {
    let _ = COVER_RESOLVER.set(resolver);
}

/// Accès global au résolveur de couvertures
///
/// Retourne `None` si aucun résolveur n'a été enregistré.
pub fn get_cover_resolver() -> Option<Arc<CoverResolver>> {
    COVER_RESOLVER.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_registration_wins() {
        let first = Arc::new(
            CoverResolver::builder("/tmp/first")
                .remote_enabled(false)
                .build()
                .unwrap(),
        );
        let second = Arc::new(CoverResolver::builder("/tmp/second").build().unwrap());

        register_cover_resolver(first.clone());
        register_cover_resolver(second);

        let registered = get_cover_resolver().unwrap();
        assert!(Arc::ptr_eq(&registered, &first));
        assert!(!registered.remote_enabled());
    }
}
