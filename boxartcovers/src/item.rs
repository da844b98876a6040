//! Éléments de bibliothèque et codes de région du service de recherche

use std::fmt;
use std::str::FromStr;

/// Préfixe des handles de contenu opaques (à déréférencer avant lecture)
pub const CONTENT_SCHEME: &str = "content://";

/// Suffixe de la couverture personnalisée placée à côté du fichier de jeu
pub const CUSTOM_COVER_SUFFIX: &str = ".cover.png";

/// Élément de bibliothèque dont on veut résoudre la couverture
///
/// Le catalogue externe en est propriétaire ; le moteur ne fait que le lire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    /// Chemin ou handle de contenu du fichier de jeu
    pub path: String,
    /// Identifiant de titre utilisé par le service distant (ex: `GALE01`)
    pub title_id: String,
    /// Titre affiché
    pub name: String,
    /// Code de région du service distant (ex: `US`, `JA`, `FR`)
    pub region: String,
    /// Référence explicite vers une couverture utilisateur
    pub cover_override: Option<String>,
}

impl LibraryItem {
    pub fn new(
        path: impl Into<String>,
        title_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            title_id: title_id.into(),
            name: String::new(),
            region: region.into(),
            cover_override: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_override(mut self, reference: impl Into<String>) -> Self {
        self.cover_override = Some(reference.into());
        self
    }

    /// Référence de la couverture utilisateur
    ///
    /// Soit la référence explicite, soit le chemin du jeu dont la dernière
    /// extension est remplacée par `.cover.png` (`/jeux/Zelda.iso` →
    /// `/jeux/Zelda.cover.png`).
    pub fn override_reference(&self) -> Option<String> {
        if let Some(reference) = &self.cover_override {
            return Some(reference.clone());
        }
        if self.path.is_empty() {
            return None;
        }

        // Séparateurs Unix et Windows
        let file_start = self.path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
        let stem = match self.path[file_start..].rfind('.') {
            Some(dot) if dot > 0 => &self.path[..file_start + dot],
            _ => self.path.as_str(),
        };
        Some(format!("{}{}", stem, CUSTOM_COVER_SUFFIX))
    }
}

/// Région du disque telle que lue dans l'en-tête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscRegion {
    NtscJ,
    NtscU,
    Pal,
    NtscK,
    Unknown,
}

impl FromStr for DiscRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ntsc-j" | "jp" | "japan" => Ok(DiscRegion::NtscJ),
            "ntsc-u" | "us" | "usa" => Ok(DiscRegion::NtscU),
            "pal" | "eu" | "europe" => Ok(DiscRegion::Pal),
            "ntsc-k" | "kr" | "korea" => Ok(DiscRegion::NtscK),
            "unknown" => Ok(DiscRegion::Unknown),
            other => Err(format!("unknown disc region '{}'", other)),
        }
    }
}

/// Pays de distribution, utile pour affiner les disques PAL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Country {
    Europe,
    Japan,
    Usa,
    Australia,
    France,
    Germany,
    Italy,
    Korea,
    Netherlands,
    Russia,
    Spain,
    Taiwan,
    World,
    Unknown,
}

impl FromStr for Country {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let country = match s.to_ascii_lowercase().as_str() {
            "europe" | "eu" => Country::Europe,
            "japan" | "jp" => Country::Japan,
            "usa" | "us" => Country::Usa,
            "australia" | "au" => Country::Australia,
            "france" | "fr" => Country::France,
            "germany" | "de" => Country::Germany,
            "italy" | "it" => Country::Italy,
            "korea" | "kr" => Country::Korea,
            "netherlands" | "nl" => Country::Netherlands,
            "russia" | "ru" => Country::Russia,
            "spain" | "es" => Country::Spain,
            "taiwan" | "tw" => Country::Taiwan,
            "world" => Country::World,
            "unknown" => Country::Unknown,
            other => return Err(format!("unknown country '{}'", other)),
        };
        Ok(country)
    }
}

impl fmt::Display for DiscRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscRegion::NtscJ => "NTSC-J",
            DiscRegion::NtscU => "NTSC-U",
            DiscRegion::Pal => "PAL",
            DiscRegion::NtscK => "NTSC-K",
            DiscRegion::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Code de région du service de couvertures pour un disque
///
/// Les disques PAL sont affinés par pays ; tout ce qui n'est pas reconnu
/// retombe sur `EN`.
pub fn lookup_region(region: DiscRegion, country: Country) -> &'static str {
    match region {
        DiscRegion::NtscJ => "JA",
        DiscRegion::NtscU => "US",
        DiscRegion::NtscK => "KO",
        DiscRegion::Pal => match country {
            Country::Australia => "AU",
            Country::France => "FR",
            Country::Germany => "DE",
            Country::Italy => "IT",
            Country::Netherlands => "NL",
            Country::Russia => "RU",
            Country::Spain => "ES",
            _ => "EN",
        },
        DiscRegion::Unknown => "EN",
    }
}
