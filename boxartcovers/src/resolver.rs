//! Contrôleur de repli en cascade
//!
//! Machine à états explicite sur le plan de repli :
//!
//! ```text
//! Pending(sources) ──hit──▶ Succeeded(artifact)
//!        │ miss / échec doux
//!        ▼
//! Pending(reste) ──vide──▶ Exhausted ──▶ placeholder
//! ```
//!
//! Les sources locales sont sondées sans accès réseau ; les sources
//! distantes suspendent la résolution le temps d'une seule requête.
//! Une résolution n'échoue jamais : le pire cas est le placeholder.

use crate::cache::CoverCache;
use crate::decode::{CoverDecoder, ImageDecoder, placeholder};
use crate::error::{CacheError, FetchError};
use crate::fetch::{CoverFetcher, DEFAULT_REQUEST_TIMEOUT_SECS, GameTdbClient};
use crate::item::LibraryItem;
use crate::key::{CoverKey, KeyResolver};
use crate::probe::LocalProbe;
use crate::source::{CoverArtifact, CoverSource, FallbackPlan};
use crate::store::{CoverStore, LocalStore};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// États d'une résolution
#[derive(Debug)]
enum ResolutionState {
    Pending(FallbackPlan),
    Succeeded(CoverArtifact),
    Exhausted,
}

/// Résultat détaillé d'une résolution
#[derive(Debug)]
pub struct Resolution {
    pub key: CoverKey,
    pub artifact: CoverArtifact,
    /// Écriture différée lancée après un succès distant
    ///
    /// L'artefact est déjà disponible ; attendre ce handle n'est utile que
    /// pour savoir quand le cache est à jour.
    pub write_back: Option<JoinHandle<Result<(), CacheError>>>,
}

/// Moteur de résolution de couvertures
///
/// Partageable entre tâches (`Arc<CoverResolver>`) : chaque appel à
/// [`CoverResolver::resolve`] construit son propre plan et ne partage aucun
/// état avec les résolutions concurrentes.
pub struct CoverResolver {
    keys: KeyResolver,
    probe: LocalProbe,
    fetcher: Arc<dyn CoverFetcher>,
    cache: CoverCache,
    fetch_timeout: Duration,
}

impl CoverResolver {
    pub fn builder(covers_dir: impl Into<PathBuf>) -> ResolverBuilder {
        ResolverBuilder::new(covers_dir)
    }

    pub fn covers_dir(&self) -> &Path {
        self.cache.cache_dir()
    }

    pub fn cache(&self) -> &CoverCache {
        &self.cache
    }

    pub fn remote_enabled(&self) -> bool {
        self.keys.remote_enabled()
    }

    /// Clé et plan de repli d'un élément, sans rien exécuter
    pub fn plan(&self, item: &LibraryItem) -> (CoverKey, FallbackPlan) {
        self.keys.resolve(item)
    }

    /// Résout la couverture d'un élément
    ///
    /// Ne retourne jamais d'erreur : une couverture réelle ou le placeholder.
    pub async fn resolve(&self, item: &LibraryItem) -> CoverArtifact {
        self.resolve_with_write_back(item).await.artifact
    }

    /// Comme [`CoverResolver::resolve`], en rendant aussi la tâche d'écriture
    /// différée lorsque la couverture vient du service distant
    pub async fn resolve_with_write_back(&self, item: &LibraryItem) -> Resolution {
        let (key, plan) = self.keys.resolve(item);
        tracing::debug!(key = %key, steps = plan.len(), "Resolving cover");

        let mut state = ResolutionState::Pending(plan);
        loop {
            state = match state {
                ResolutionState::Pending(plan) => self.step(item, plan).await,
                ResolutionState::Succeeded(artifact) => {
                    let write_back = self.schedule_write_back(&key, &artifact);
                    return Resolution {
                        key,
                        artifact,
                        write_back,
                    };
                }
                ResolutionState::Exhausted => {
                    tracing::debug!(key = %key, "No cover source succeeded, using placeholder");
                    return Resolution {
                        key,
                        artifact: placeholder(),
                        write_back: None,
                    };
                }
            };
        }
    }

    /// Une transition : consomme la prochaine source du plan
    async fn step(&self, item: &LibraryItem, mut plan: FallbackPlan) -> ResolutionState {
        let Some(source) = plan.pop() else {
            return ResolutionState::Exhausted;
        };

        let found = match &source {
            CoverSource::UserOverride(_) | CoverSource::LocalCache(_) => {
                self.probe.probe(&source).await
            }
            CoverSource::Remote(region) => match self.fetch(region, item).await {
                Ok(artifact) => {
                    tracing::info!(
                        title_id = %item.title_id,
                        region = %region,
                        bytes = artifact.len(),
                        "Cover fetched from lookup service"
                    );
                    Some(artifact)
                }
                Err(e) => {
                    tracing::warn!(
                        title_id = %item.title_id,
                        region = %region,
                        "Cover lookup failed: {}",
                        e
                    );
                    None
                }
            },
        };

        match found {
            Some(artifact) => ResolutionState::Succeeded(artifact),
            None => ResolutionState::Pending(plan),
        }
    }

    async fn fetch(&self, region: &str, item: &LibraryItem) -> Result<CoverArtifact, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(region, item)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    /// Lance l'écriture différée hors du chemin critique
    fn schedule_write_back(
        &self,
        key: &CoverKey,
        artifact: &CoverArtifact,
    ) -> Option<JoinHandle<Result<(), CacheError>>> {
        if !artifact.provenance.is_remote() {
            return None;
        }

        let cache = self.cache.clone();
        let key = key.clone();
        let artifact = artifact.clone();
        Some(tokio::spawn(async move {
            let result = cache.store(&key, &artifact).await;
            if let Err(ref e) = result {
                tracing::warn!("Cannot cache cover {}: {}", key, e);
            }
            result
        }))
    }
}

/// Builder for [`CoverResolver`]
pub struct ResolverBuilder {
    covers_dir: PathBuf,
    store: Option<Arc<dyn CoverStore>>,
    fetcher: Option<Arc<dyn CoverFetcher>>,
    decoder: Option<Arc<dyn CoverDecoder>>,
    lookup_url: Option<String>,
    remote_enabled: bool,
    fetch_timeout: Duration,
}

impl ResolverBuilder {
    pub fn new(covers_dir: impl Into<PathBuf>) -> Self {
        Self {
            covers_dir: covers_dir.into(),
            store: None,
            fetcher: None,
            decoder: None,
            lookup_url: None,
            remote_enabled: true,
            fetch_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Stockage utilisé pour les sondes et le cache (défaut : [`LocalStore`])
    pub fn store(mut self, store: Arc<dyn CoverStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Collaborateur de recherche distante (défaut : [`GameTdbClient`])
    pub fn fetcher(mut self, fetcher: Arc<dyn CoverFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Décodeur de validation (défaut : [`ImageDecoder`])
    pub fn decoder(mut self, decoder: Arc<dyn CoverDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Gabarit d'URL du client par défaut
    pub fn lookup_url(mut self, template: impl Into<String>) -> Self {
        self.lookup_url = Some(template.into());
        self
    }

    /// Active ou désactive toute recherche réseau
    pub fn remote_enabled(mut self, enabled: bool) -> Self {
        self.remote_enabled = enabled;
        self
    }

    /// Délai au-delà duquel une recherche est considérée comme échouée
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<CoverResolver> {
        let store = self.store.unwrap_or_else(|| Arc::new(LocalStore::new()));
        let decoder = self.decoder.unwrap_or_else(|| Arc::new(ImageDecoder));

        let fetcher: Arc<dyn CoverFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let mut builder = GameTdbClient::builder()
                    .timeout(self.fetch_timeout)
                    .decoder(Arc::clone(&decoder));
                if let Some(template) = self.lookup_url {
                    builder = builder.url_template(template);
                }
                Arc::new(builder.build()?)
            }
        };

        Ok(CoverResolver {
            keys: KeyResolver::new(self.covers_dir.clone(), self.remote_enabled),
            probe: LocalProbe::new(Arc::clone(&store), decoder),
            fetcher,
            cache: CoverCache::new(self.covers_dir, store),
            fetch_timeout: self.fetch_timeout,
        })
    }
}

/// Crée un résolveur après avoir nettoyé son cache
///
/// Les fichiers temporaires abandonnés par des écritures interrompues sont
/// supprimés avant que le résolveur ne soit rendu. Un échec du nettoyage est
/// journalisé et n'empêche pas la création.
pub async fn new_resolver_with_consolidation(
    builder: ResolverBuilder,
) -> Result<Arc<CoverResolver>> {
    let resolver = Arc::new(builder.build()?);
    match resolver.cache().consolidate().await {
        Ok(removed) => {
            tracing::info!("Cover cache consolidated ({} stale file(s) removed)", removed)
        }
        Err(e) => tracing::warn!("Failed to consolidate cover cache on startup: {}", e),
    }
    Ok(resolver)
}
