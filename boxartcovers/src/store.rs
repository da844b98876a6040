//! Stockage persistant adressé par chemin
//!
//! Le stockage peut être un système de fichiers local ou un magasin de
//! handles de contenu opaques (`content://...`) qu'il faut d'abord
//! déréférencer avant toute lecture.

use crate::error::ProbeMiss;
use crate::item::CONTENT_SCHEME;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Suffixe des fichiers temporaires d'écriture atomique
pub const TEMP_SUFFIX: &str = ".tmp";

/// Indique si un chemin désigne un fichier temporaire d'écriture atomique
///
/// Forme : `.{nom}.{uuid}.tmp`, à côté du fichier cible.
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX))
}

/// Fichier présent dans un répertoire du stockage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Date de dernière modification, si le stockage la connaît
    pub modified: Option<SystemTime>,
}

/// Collaborateur de stockage utilisé par la sonde locale et le cache
#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Transforme une référence (chemin ou handle) en chemin lisible
    async fn dereference(&self, reference: &str) -> Result<PathBuf, ProbeMiss>;

    /// Vérifie l'existence d'un fichier
    async fn exists(&self, path: &Path) -> bool;

    /// Lit le contenu complet d'un fichier
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Remplace atomiquement le contenu d'un fichier
    ///
    /// Deux écritures concurrentes sur le même chemin ne doivent jamais
    /// laisser un fichier partiel : la dernière gagne.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Liste les fichiers d'un répertoire (vide si le répertoire n'existe pas)
    async fn list(&self, dir: &Path) -> io::Result<Vec<StoredFile>>;

    /// Supprime un fichier
    async fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Stockage sur le système de fichiers local
///
/// Les handles `content://<autorité>/<reste>` sont résolus sous une racine
/// de contenu optionnelle : `<racine>/<autorité>/<reste>`.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    content_root: Option<PathBuf>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_root(root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: Some(root.into()),
        }
    }

    pub fn content_root(&self) -> Option<&Path> {
        self.content_root.as_deref()
    }

    fn unmangle(&self, handle: &str) -> Result<PathBuf, ProbeMiss> {
        let root = self
            .content_root
            .as_ref()
            .ok_or_else(|| ProbeMiss::NotFound(handle.to_string()))?;

        let relative = Path::new(handle.trim_start_matches(CONTENT_SCHEME));
        let mut resolved = root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                // Un handle ne doit jamais sortir de la racine de contenu
                _ => return Err(ProbeMiss::PermissionDenied(handle.to_string())),
            }
        }
        Ok(resolved)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        path.with_file_name(format!(
            ".{}.{}{}",
            file_name,
            uuid::Uuid::new_v4(),
            TEMP_SUFFIX
        ))
    }
}

#[async_trait]
impl CoverStore for LocalStore {
    async fn dereference(&self, reference: &str) -> Result<PathBuf, ProbeMiss> {
        if reference.starts_with(CONTENT_SCHEME) {
            let path = self.unmangle(reference)?;
            return match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => Ok(path),
                Ok(_) => Err(ProbeMiss::NotFound(reference.to_string())),
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    Err(ProbeMiss::PermissionDenied(reference.to_string()))
                }
                Err(_) => Err(ProbeMiss::NotFound(reference.to_string())),
            };
        }
        Ok(PathBuf::from(reference))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = Self::temp_path(path);
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    async fn list(&self, dir: &Path) -> io::Result<Vec<StoredFile>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Une écriture concurrente peut renommer l'entrée entre-temps
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if meta.is_file() {
                files.push(StoredFile {
                    path: entry.path(),
                    modified: meta.modified().ok(),
                });
            }
        }
        Ok(files)
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
