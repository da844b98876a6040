//! # boxartconfig - Configuration de BoxArt
//!
//! Un fichier `config.yaml` dans le répertoire de configuration, fusionné
//! par-dessus une configuration par défaut intégrée au binaire, puis
//! surchargé par les variables d'environnement `BOXART_CONFIG__SECTION__CLE`.
//! Le résultat de la fusion est réécrit sur disque.
//!
//! ## Usage
//!
//! ```no_run
//! use boxartconfig::get_config;
//!
//! let config = get_config();
//! let remote = config.get_use_game_covers()?;
//! let level = config.get_log_min_level()?;
//!
//! config.set_use_game_covers(false)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod location;
mod tree;

pub use location::{CONFIG_DIR_NAME, ENV_CONFIG_DIR, config_dir};

use anyhow::Result;
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("boxart.yaml");

const ENV_PREFIX: &str = "BOXART_CONFIG__";
const CONFIG_FILE_NAME: &str = "config.yaml";

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config(None).expect("Failed to load BoxArt configuration"));
}

/// Chemins des clés connues
pub mod keys {
    pub const LOG_MIN_LEVEL: &[&str] = &["host", "logger", "min_level"];
    pub const LOG_ENABLE_CONSOLE: &[&str] = &["host", "logger", "enable_console"];
    pub const USE_GAME_COVERS: &[&str] = &["covers", "use_game_covers"];
    pub const COVERS_DIRECTORY: &[&str] = &["covers", "directory"];
    pub const COVER_LOOKUP_URL: &[&str] = &["covers", "lookup_url"];
    pub const COVER_FETCH_TIMEOUT_SECS: &[&str] = &["covers", "fetch_timeout_secs"];
    pub const CONTENT_ROOT: &[&str] = &["covers", "content_root"];
}

/// Valeur scalaire lisible et écrivable dans l'arbre de configuration
pub trait ConfigValue: Sized {
    fn from_yaml(value: &Value) -> Option<Self>;
    fn into_yaml(self) -> Value;
}

impl ConfigValue for bool {
    fn from_yaml(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn into_yaml(self) -> Value {
        Value::Bool(self)
    }
}

impl ConfigValue for u64 {
    fn from_yaml(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn into_yaml(self) -> Value {
        Value::Number(Number::from(self))
    }
}

impl ConfigValue for String {
    fn from_yaml(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_yaml(self) -> Value {
        Value::String(self)
    }
}

/// Génère un couple getter/setter typé avec valeur par défaut
macro_rules! config_accessors {
    ($( $getter:ident, $setter:ident: $ty:ty = $path:expr, $default:expr; )*) => {
        $(
            pub fn $getter(&self) -> Result<$ty> {
                Ok(self.get_or($path, <$ty>::from($default)))
            }

            pub fn $setter(&self, value: $ty) -> Result<()> {
                self.set($path, value)
            }
        )*
    };
}

/// Configuration de BoxArt
///
/// # Examples
///
/// ```no_run
/// use boxartconfig::Config;
/// use std::path::Path;
///
/// let config = Config::load_config(Some(Path::new("/tmp/boxart")))?;
/// println!("Remote lookups: {}", config.get_use_game_covers()?);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Charge la configuration
    ///
    /// `directory` à `None` (ou vide) déclenche la recherche habituelle :
    /// `BOXART_CONFIG`, `./.boxart`, `~/.boxart`.
    pub fn load_config(directory: Option<&Path>) -> Result<Self> {
        let dir = config_dir(directory)?;
        info!(config_dir = %dir.display(), "Using config directory");
        Self::load_from(dir, std::env::vars())
    }

    fn load_from<I>(dir: PathBuf, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let file = dir.join(CONFIG_FILE_NAME);
        let mut data = tree::lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);

        match fs::read(&file) {
            Ok(bytes) => {
                info!(config_file = %file.display(), "Loaded config file");
                let external: Value = serde_yaml::from_slice(&bytes)?;
                // Un fichier vide se lit comme Null : rien à fusionner
                if !external.is_null() {
                    tree::merge(&mut data, tree::lowercase_keys(external));
                }
            }
            Err(_) => {
                info!(config_file = %file.display(), "Config file not found, using embedded defaults");
            }
        }

        let overrides = tree::apply_env_overrides(&mut data, ENV_PREFIX, vars);
        if overrides > 0 {
            info!("{} configuration value(s) overridden from environment", overrides);
        }

        let config = Config {
            dir,
            file,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Répertoire contenant `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Écrit la configuration courante dans `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.file, yaml)?;
        Ok(())
    }

    /// Lit la valeur brute à `path` (erreur si le chemin n'existe pas)
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        tree::lookup(&self.data(), path).cloned()
    }

    /// Écrit une valeur brute à `path` puis sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        tree::insert(&mut self.data(), path, value)?;
        self.save()
    }

    /// Valeur typée à `path`, ou `default` si absente ou mal typée
    pub fn get_or<T: ConfigValue>(&self, path: &[&str], default: T) -> T {
        self.get_value(path)
            .ok()
            .and_then(|v| T::from_yaml(&v))
            .unwrap_or(default)
    }

    /// Écrit une valeur typée à `path` puis sauvegarde
    pub fn set<T: ConfigValue>(&self, path: &[&str], value: T) -> Result<()> {
        self.set_value(path, value.into_yaml())
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Un chemin relatif est résolu par rapport au répertoire de
    /// configuration. Le répertoire est créé s'il n'existe pas ; une entrée
    /// absente ou vide est initialisée à `default`.
    ///
    /// ```no_run
    /// use boxartconfig::{get_config, keys};
    ///
    /// let covers_dir = get_config().get_managed_dir(keys::COVERS_DIRECTORY, "cache_covers")?;
    /// println!("Covers directory: {}", covers_dir.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let configured: String = self.get_or(path, String::new());
        let configured = if configured.trim().is_empty() {
            self.set_managed_dir(path, default.to_string())?;
            default.to_string()
        } else {
            configured
        };

        let dir = Path::new(&configured);
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.dir.join(dir)
        };

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!(directory = %dir.display(), "Created managed directory");
        }
        Ok(dir)
    }

    /// Définit un répertoire géré par la configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set(path, directory)
    }

    config_accessors! {
        get_log_min_level, set_log_min_level: String = keys::LOG_MIN_LEVEL, "INFO";
        get_log_enable_console, set_log_enable_console: bool = keys::LOG_ENABLE_CONSOLE, true;
        get_use_game_covers, set_use_game_covers: bool = keys::USE_GAME_COVERS, true;
        get_cover_lookup_url, set_cover_lookup_url: String = keys::COVER_LOOKUP_URL,
            "https://art.gametdb.com/wii/cover/{region}/{title_id}.png";
        get_cover_fetch_timeout_secs, set_cover_fetch_timeout_secs: u64 =
            keys::COVER_FETCH_TIMEOUT_SECS, 30u64;
        get_content_root, set_content_root: String = keys::CONTENT_ROOT, "";
    }
}

/// Instance globale de la configuration
///
/// Chargée au premier accès depuis le répertoire par défaut. Le code qui
/// connaît son répertoire doit appeler [`Config::load_config`].
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}
