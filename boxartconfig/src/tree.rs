//! Manipulation de l'arbre YAML de configuration
//!
//! Toutes les clés sont en minuscules : l'arbre est normalisé au chargement
//! et chaque chemin l'est à l'accès.

use anyhow::{Result, anyhow};
use serde_yaml::{Mapping, Value};

/// Met toutes les clés textuelles en minuscules, récursivement
pub(crate) fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Fusionne `overlay` dans `base`
///
/// Les tables sont fusionnées clé par clé ; scalaires et séquences de
/// `overlay` remplacent ceux de `base`.
pub(crate) fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn key(segment: &str) -> Value {
    Value::String(segment.to_lowercase())
}

/// Lit le nœud situé à `path`
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("{} is not a table", path[..depth].join(".")));
        };
        current = map
            .get(&key(segment))
            .ok_or_else(|| anyhow!("{} does not exist", path[..=depth].join(".")))?;
    }
    Ok(current)
}

/// Écrit `value` à `path`, en créant les tables intermédiaires
pub(crate) fn insert(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Cannot descend into {}: not a table", segment));
        };
        current = map
            .entry(key(segment))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match current {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => Err(anyhow!("Cannot set {}: parent is not a table", path.join("."))),
    }
}

/// Interprète une valeur d'environnement comme du YAML (texte brut sinon)
pub(crate) fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Applique les variables `PREFIX` + `SECTION__KEY=valeur`
///
/// Retourne le nombre de surcharges appliquées.
pub(crate) fn apply_env_overrides<I>(root: &mut Value, prefix: &str, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (name, raw) in vars {
        let Some(stripped) = name.strip_prefix(prefix) else {
            continue;
        };
        let path: Vec<&str> = stripped.split("__").filter(|s| !s.is_empty()).collect();
        if path.is_empty() {
            continue;
        }
        match insert(root, &path, parse_scalar(&raw)) {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!("Ignoring environment override {}: {}", name, e),
        }
    }
    applied
}
