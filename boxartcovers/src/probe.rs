//! Sonde des sources locales (couverture utilisateur, cache disque)
//!
//! Jamais d'accès réseau ici : uniquement des vérifications et lectures
//! sur le stockage local.

use crate::decode::{CoverDecoder, CoverInfo};
use crate::error::ProbeMiss;
use crate::source::{CoverArtifact, CoverSource, Provenance};
use crate::store::CoverStore;
use std::path::Path;
use std::sync::Arc;

pub struct LocalProbe {
    store: Arc<dyn CoverStore>,
    decoder: Arc<dyn CoverDecoder>,
}

impl LocalProbe {
    pub fn new(store: Arc<dyn CoverStore>, decoder: Arc<dyn CoverDecoder>) -> Self {
        Self { store, decoder }
    }

    /// Essaie une source locale
    ///
    /// Retourne `None` pour une source distante ou en cas d'absence ; la
    /// raison de l'absence est journalisée au niveau debug.
    pub async fn probe(&self, source: &CoverSource) -> Option<CoverArtifact> {
        let result = match source {
            CoverSource::UserOverride(reference) => self.probe_override(reference).await,
            CoverSource::LocalCache(path) => self.probe_path(path).await,
            CoverSource::Remote(_) => return None,
        };

        match result {
            Ok((bytes, info)) => Some(
                CoverArtifact::new(bytes, Provenance::from(source))
                    .with_dimensions(info.width, info.height),
            ),
            Err(miss) => {
                tracing::debug!(source = %source, reason = %miss, "Local cover probe missed");
                None
            }
        }
    }

    async fn probe_override(
        &self,
        reference: &str,
    ) -> Result<(Vec<u8>, CoverInfo), ProbeMiss> {
        let path = self.store.dereference(reference).await?;
        self.probe_path(&path).await
    }

    async fn probe_path(
        &self,
        path: &Path,
    ) -> Result<(Vec<u8>, CoverInfo), ProbeMiss> {
        let display = path.display().to_string();
        if !self.store.exists(path).await {
            return Err(ProbeMiss::NotFound(display));
        }

        let bytes = self.store.read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProbeMiss::NotFound(display.clone()),
            std::io::ErrorKind::PermissionDenied => ProbeMiss::PermissionDenied(display.clone()),
            _ => ProbeMiss::Unreadable(format!("{}: {}", display, e)),
        })?;

        // Décodage complet hors du runtime asynchrone
        let decoder = Arc::clone(&self.decoder);
        let (bytes, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(&bytes);
            (bytes, decoded)
        })
        .await
        .map_err(|e| ProbeMiss::Unreadable(format!("{}: {}", display, e)))?;

        let info = decoded.map_err(|e| ProbeMiss::Undecodable(format!("{}: {}", display, e)))?;
        Ok((bytes, info))
    }
}
