//! Cache persistant des couvertures obtenues à distance
//!
//! Chaque couverture est un fichier `{key}.png` dans le répertoire du cache.
//! Les enregistrements ne sont jamais modifiés en place : une nouvelle
//! écriture remplace le fichier entier de façon atomique.

use crate::error::CacheError;
use crate::key::CoverKey;
use crate::source::CoverArtifact;
use crate::store::{CoverStore, is_temp_file};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Âge minimal d'un fichier temporaire avant que la consolidation le supprime
///
/// Un fichier plus récent peut appartenir à une écriture encore en cours.
pub const TEMP_FILE_GRACE: Duration = Duration::from_secs(300);

/// Cache d'écriture différée
#[derive(Clone)]
pub struct CoverCache {
    dir: PathBuf,
    store: Arc<dyn CoverStore>,
}

impl CoverCache {
    pub fn new(dir: impl Into<PathBuf>, store: Arc<dyn CoverStore>) -> Self {
        Self {
            dir: dir.into(),
            store,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Chemin de l'enregistrement associé à une clé
    pub fn path_for(&self, key: &CoverKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub async fn contains(&self, key: &CoverKey) -> bool {
        self.store.exists(&self.path_for(key)).await
    }

    /// Enregistre un artefact d'origine distante
    ///
    /// Idempotent : stocker plusieurs fois la même clé laisse exactement un
    /// enregistrement, celui de la dernière écriture.
    pub async fn store(&self, key: &CoverKey, artifact: &CoverArtifact) -> Result<(), CacheError> {
        if !artifact.provenance.is_remote() {
            return Err(CacheError::NotRemote(artifact.provenance.to_string()));
        }

        let path = self.path_for(key);
        self.store.write_atomic(&path, &artifact.bytes).await?;
        tracing::debug!(key = %key, path = %path.display(), bytes = artifact.len(), "Cover cached");
        Ok(())
    }

    /// Supprime l'enregistrement d'une clé (absence ignorée)
    pub async fn remove(&self, key: &CoverKey) -> Result<(), CacheError> {
        match self.store.remove(&self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Supprime les fichiers temporaires laissés par des écritures interrompues
    ///
    /// Seuls les fichiers plus vieux que [`TEMP_FILE_GRACE`] sont supprimés ;
    /// un fichier sans date connue est conservé. Retourne le nombre de
    /// fichiers supprimés.
    pub async fn consolidate(&self) -> Result<usize, CacheError> {
        self.consolidate_older_than(TEMP_FILE_GRACE).await
    }

    async fn consolidate_older_than(&self, grace: Duration) -> Result<usize, CacheError> {
        let now = SystemTime::now();
        let mut removed = 0;

        for file in self.store.list(&self.dir).await? {
            if !is_temp_file(&file.path) {
                continue;
            }
            let stale = file
                .modified
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age >= grace);
            if !stale {
                continue;
            }

            match self.store.remove(&file.path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Cannot remove stale temp file {}: {}", file.path.display(), e)
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LibraryItem;
    use crate::source::Provenance;
    use crate::store::LocalStore;

    fn cache_in(dir: &Path) -> CoverCache {
        CoverCache::new(dir, Arc::new(LocalStore::new()))
    }

    fn key(title_id: &str) -> CoverKey {
        CoverKey::for_item(&LibraryItem::new("/games/x.iso", title_id, "US"))
    }

    #[tokio::test]
    async fn test_store_remote_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let k = key("K1");

        let artifact = CoverArtifact::new(&b"cover-bytes"[..], Provenance::Remote("US".into()));
        cache.store(&k, &artifact).await.unwrap();

        assert!(cache.contains(&k).await);
        assert_eq!(std::fs::read(dir.path().join("K1.png")).unwrap(), b"cover-bytes");
    }

    #[tokio::test]
    async fn test_store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let k = key("K1");

        for payload in [&b"one"[..], &b"two"[..], &b"two"[..]] {
            let artifact = CoverArtifact::new(payload, Provenance::Remote("EN".into()));
            cache.store(&k, &artifact).await.unwrap();
        }

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(cache.path_for(&k)).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_non_remote_artifacts_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let k = key("K2");

        for provenance in [
            Provenance::Placeholder,
            Provenance::UserOverride("/a.cover.png".into()),
            Provenance::LocalCache(dir.path().join("K2.png")),
        ] {
            let artifact = CoverArtifact::new(&b"x"[..], provenance);
            assert!(matches!(
                cache.store(&k, &artifact).await,
                Err(CacheError::NotRemote(_))
            ));
        }
        assert!(!cache.contains(&k).await);
    }

    #[tokio::test]
    async fn test_concurrent_stores_leave_one_complete_record() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let k = key("K3");

        let a = vec![b'a'; 64 * 1024];
        let b = vec![b'b'; 64 * 1024];
        let art_a = CoverArtifact::new(a.clone(), Provenance::Remote("US".into()));
        let art_b = CoverArtifact::new(b.clone(), Provenance::Remote("EN".into()));
        let (ra, rb) = tokio::join!(cache.store(&k, &art_a), cache.store(&k, &art_b));
        ra.unwrap();
        rb.unwrap();

        let stored = std::fs::read(cache.path_for(&k)).unwrap();
        assert!(stored == a || stored == b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    /// Écrit un fichier en antidatant sa date de modification
    fn write_aged(path: &Path, data: &[u8], age: Duration) {
        std::fs::write(path, data).unwrap();
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[tokio::test]
    async fn test_consolidate_removes_stale_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let hour = Duration::from_secs(3600);
        write_aged(&dir.path().join(".K1.png.1234.tmp"), b"partial", hour);
        write_aged(&dir.path().join("K1.png"), b"complete", hour);
        std::fs::write(dir.path().join(".K2.png.5678.tmp"), b"in flight").unwrap();

        assert_eq!(cache.consolidate().await.unwrap(), 1);
        assert!(dir.path().join("K1.png").exists());
        assert!(!dir.path().join(".K1.png.1234.tmp").exists());
        // Trop récent : peut-être une écriture en cours
        assert!(dir.path().join(".K2.png.5678.tmp").exists());
    }

    #[tokio::test]
    async fn test_consolidate_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir.path().join("absent"));
        assert_eq!(cache.consolidate().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consolidate_never_loses_concurrent_write_backs() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let payload = vec![7u8; 2 * 1024 * 1024];

        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let sweeper = {
            let cache = cache.clone();
            let done = done.clone();
            tokio::spawn(async move {
                while !done.load(std::sync::atomic::Ordering::SeqCst) {
                    cache.consolidate().await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut writers = Vec::new();
        for i in 0..20 {
            let cache = cache.clone();
            let payload = payload.clone();
            writers.push(tokio::spawn(async move {
                let k = key(&format!("W{}", i));
                let artifact = CoverArtifact::new(payload, Provenance::Remote("US".into()));
                cache.store(&k, &artifact).await.map(|_| k)
            }));
        }

        let mut keys = Vec::new();
        for writer in writers {
            keys.push(writer.await.unwrap().unwrap());
        }
        done.store(true, std::sync::atomic::Ordering::SeqCst);
        sweeper.await.unwrap();

        for k in &keys {
            assert!(cache.contains(k).await, "{} lost", k);
        }
    }

    #[tokio::test]
    async fn test_remove_deletes_record() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let k = key("K4");
        let artifact = CoverArtifact::new(&b"x"[..], Provenance::Remote("US".into()));
        cache.store(&k, &artifact).await.unwrap();

        cache.remove(&k).await.unwrap();
        assert!(!cache.contains(&k).await);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.remove(&key("nothing")).await.unwrap();
    }
}
