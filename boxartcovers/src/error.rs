//! Erreurs du moteur de résolution de couvertures
//!
//! Aucune de ces erreurs n'atteint l'appelant de [`crate::CoverResolver::resolve`] :
//! elles font avancer le plan de repli ou sont simplement journalisées.

use thiserror::Error;

/// Raison pour laquelle une source locale n'a rien donné
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeMiss {
    /// La référence ou le fichier n'existe pas
    #[error("not found: {0}")]
    NotFound(String),

    /// Le déréférencement d'un handle de contenu a été refusé
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Le fichier existe mais n'a pas pu être lu
    #[error("unreadable: {0}")]
    Unreadable(String),

    /// Les octets lus ne forment pas une image décodable
    #[error("undecodable image: {0}")]
    Undecodable(String),
}

/// Erreur de décodage renvoyée par un [`crate::CoverDecoder`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot decode cover image: {0}")]
pub struct DecodeError(pub String);

/// Échec (toujours « doux ») d'une recherche distante
#[derive(Error, Debug)]
pub enum FetchError {
    /// L'élément n'a pas d'identifiant de titre utilisable dans l'URL
    #[error("library item {0} has no title identifier")]
    MissingTitleId(String),

    /// L'URL construite à partir du gabarit est invalide
    #[error("invalid lookup URL {0}")]
    InvalidUrl(String),

    /// Erreur de transport HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Réponse non 2xx (typiquement 404)
    #[error("lookup service answered with status {0}")]
    Status(u16),

    /// Le délai réseau a expiré
    #[error("lookup timed out")]
    Timeout,

    /// Contenu reçu mais non décodable
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// La tâche de décodage a été interrompue
    #[error("decode task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Indique si l'erreur correspond à une absence de couverture côté service
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(404))
    }
}

/// Échec d'écriture dans le cache persistant (jamais fatal)
#[derive(Error, Debug)]
pub enum CacheError {
    /// Seuls les artefacts d'origine distante sont mis en cache
    #[error("refusing to cache an artifact whose provenance is {0}")]
    NotRemote(String),

    /// Erreur d'entrée/sortie lors de l'écriture
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
