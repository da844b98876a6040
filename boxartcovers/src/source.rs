//! Sources candidates, plan de repli et artefacts résolus

use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

/// Une source candidate du plan de repli
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    /// Couverture fournie par l'utilisateur (chemin ou handle de contenu)
    UserOverride(String),
    /// Couverture déjà mise en cache sur disque
    LocalCache(PathBuf),
    /// Recherche distante pour un code de région
    Remote(String),
}

impl CoverSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, CoverSource::Remote(_))
    }
}

impl fmt::Display for CoverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverSource::UserOverride(reference) => write!(f, "override({})", reference),
            CoverSource::LocalCache(path) => write!(f, "cache({})", path.display()),
            CoverSource::Remote(region) => write!(f, "remote({})", region),
        }
    }
}

/// Séquence ordonnée et finie des sources à essayer
///
/// Chaque source est consommée au plus une fois : le plan se vide au fil
/// de la résolution et ne peut pas boucler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackPlan {
    sources: VecDeque<CoverSource>,
}

impl FallbackPlan {
    pub fn new(sources: impl IntoIterator<Item = CoverSource>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
        }
    }

    /// Retire la prochaine source à essayer
    pub fn pop(&mut self) -> Option<CoverSource> {
        self.sources.pop_front()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverSource> {
        self.sources.iter()
    }

    /// Régions distantes restantes, dans l'ordre
    pub fn remote_regions(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter_map(|s| match s {
                CoverSource::Remote(region) => Some(region.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Retire toutes les recherches distantes (réseau désactivé)
    pub fn without_remote(mut self) -> Self {
        self.sources.retain(|s| !s.is_remote());
        self
    }
}

/// Origine d'un artefact résolu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    UserOverride(String),
    LocalCache(PathBuf),
    Remote(String),
    Placeholder,
}

impl Provenance {
    pub fn is_remote(&self) -> bool {
        matches!(self, Provenance::Remote(_))
    }
}

impl From<&CoverSource> for Provenance {
    fn from(source: &CoverSource) -> Self {
        match source {
            CoverSource::UserOverride(reference) => Provenance::UserOverride(reference.clone()),
            CoverSource::LocalCache(path) => Provenance::LocalCache(path.clone()),
            CoverSource::Remote(region) => Provenance::Remote(region.clone()),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::UserOverride(reference) => write!(f, "user override {}", reference),
            Provenance::LocalCache(path) => write!(f, "local cache {}", path.display()),
            Provenance::Remote(region) => write!(f, "remote lookup ({})", region),
            Provenance::Placeholder => f.write_str("placeholder"),
        }
    }
}

/// Image résolue, prête à être remise au collaborateur d'affichage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArtifact {
    /// Octets de l'image tels que lus ou reçus
    pub bytes: Bytes,
    /// Dimensions en pixels, si le décodeur les a fournies
    pub dimensions: Option<(u32, u32)>,
    pub provenance: Provenance,
}

impl CoverArtifact {
    pub fn new(bytes: impl Into<Bytes>, provenance: Provenance) -> Self {
        Self {
            bytes: bytes.into(),
            dimensions: None,
            provenance,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.provenance == Provenance::Placeholder
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pops_in_order_and_terminates() {
        let mut plan = FallbackPlan::new([
            CoverSource::LocalCache(PathBuf::from("/c/K.png")),
            CoverSource::Remote("JA".into()),
            CoverSource::Remote("US".into()),
        ]);

        assert_eq!(plan.remote_regions(), vec!["JA", "US"]);
        assert_eq!(plan.pop(), Some(CoverSource::LocalCache(PathBuf::from("/c/K.png"))));
        assert_eq!(plan.pop(), Some(CoverSource::Remote("JA".into())));
        assert_eq!(plan.pop(), Some(CoverSource::Remote("US".into())));
        assert_eq!(plan.pop(), None);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_without_remote() {
        let plan = FallbackPlan::new([
            CoverSource::UserOverride("/a.cover.png".into()),
            CoverSource::Remote("US".into()),
            CoverSource::LocalCache(PathBuf::from("/c/K.png")),
        ])
        .without_remote();

        assert_eq!(plan.len(), 2);
        assert!(plan.remote_regions().is_empty());
    }

    #[test]
    fn test_provenance_from_source() {
        assert_eq!(
            Provenance::from(&CoverSource::Remote("EN".into())),
            Provenance::Remote("EN".into())
        );
        assert!(Provenance::Remote("EN".into()).is_remote());
        assert!(!Provenance::Placeholder.is_remote());
    }
}
