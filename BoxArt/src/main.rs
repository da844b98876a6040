//! BoxArt - résolution de couvertures en ligne de commande
//!
//! ## Usage
//!
//! ```bash
//! # Résoudre la couverture d'un jeu et l'écrire dans un fichier
//! BoxArt resolve --path /games/Zelda.iso --title-id GZLE01 --region US --output zelda.png
//!
//! # Afficher le plan de repli sans rien exécuter
//! BoxArt plan --path /games/Zelda.iso --title-id GZLE01 --region US
//!
//! # Code de région de recherche pour un disque PAL français
//! BoxArt region --disc pal --country france
//!
//! # Nettoyer les fichiers temporaires du cache
//! BoxArt --config ./.boxart consolidate
//! ```

mod logging;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use boxartconfig::Config;
use boxartcovers::{
    CoverConfigExt, CoverSource, Country, DiscRegion, LibraryItem, lookup_region,
    new_resolver_with_consolidation,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "BoxArt")]
#[command(version)]
#[command(about = "Résolution des couvertures de jeux", long_about = None)]
struct Cli {
    /// Répertoire de configuration (défaut : BOXART_CONFIG, ./.boxart, ~/.boxart)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sortie JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Résout la couverture d'un élément de bibliothèque
    Resolve {
        #[command(flatten)]
        item: ItemArgs,

        /// Fichier où écrire l'image obtenue
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Aucune recherche réseau
        #[arg(long)]
        offline: bool,
    },
    /// Affiche la clé de cache et le plan de repli
    Plan {
        #[command(flatten)]
        item: ItemArgs,

        /// Plan sans sources distantes
        #[arg(long)]
        offline: bool,
    },
    /// Calcule le code de région de recherche d'un disque
    Region {
        /// Région du disque (ntsc-j, ntsc-u, ntsc-k, pal, unknown)
        #[arg(long)]
        disc: DiscRegion,

        /// Pays (utilisé pour les disques PAL)
        #[arg(long, default_value = "europe")]
        country: Country,
    },
    /// Supprime les fichiers temporaires du cache de couvertures
    Consolidate,
}

#[derive(Args, Debug)]
struct ItemArgs {
    /// Chemin ou handle de contenu de l'élément
    #[arg(long)]
    path: String,

    /// Identifiant de titre (ex: GZLE01)
    #[arg(long, default_value = "")]
    title_id: String,

    /// Code de région de recherche
    #[arg(long, default_value = "EN")]
    region: String,

    /// Titre affiché
    #[arg(long)]
    name: Option<String>,

    /// Référence explicite de la couverture utilisateur
    #[arg(long = "override")]
    cover_override: Option<String>,
}

impl ItemArgs {
    fn to_item(&self) -> LibraryItem {
        let mut item = LibraryItem::new(&self.path, &self.title_id, &self.region);
        if let Some(name) = &self.name {
            item = item.with_name(name);
        }
        if let Some(reference) = &self.cover_override {
            item = item.with_override(reference);
        }
        item
    }
}

#[derive(Serialize)]
struct ResolveReport {
    key: String,
    provenance: String,
    bytes: usize,
    width: Option<u32>,
    height: Option<u32>,
    placeholder: bool,
    output: Option<String>,
}

#[derive(Serialize)]
struct PlanReport {
    key: String,
    sources: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config.as_deref())?;
    logging::init_logging(&config)?;

    match &cli.command {
        Command::Resolve {
            item,
            output,
            offline,
        } => resolve(&config, item.to_item(), output.as_ref(), *offline, cli.json).await,
        Command::Plan { item, offline } => plan(&config, item.to_item(), *offline, cli.json),
        Command::Region { disc, country } => {
            let region = lookup_region(*disc, *country);
            if cli.json {
                println!("{}", serde_json::json!({ "region": region }));
            } else {
                println!("{}", region);
            }
            Ok(())
        }
        Command::Consolidate => {
            let resolver = config.create_cover_resolver()?;
            let removed = resolver.cache().consolidate().await?;
            info!(
                "Cover cache {} consolidated",
                resolver.covers_dir().display()
            );
            if cli.json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("{} stale file(s) removed", removed);
            }
            Ok(())
        }
    }
}

async fn resolve(
    config: &Config,
    item: LibraryItem,
    output: Option<&PathBuf>,
    offline: bool,
    json: bool,
) -> Result<()> {
    let mut builder = config.cover_resolver_builder()?;
    if offline {
        builder = builder.remote_enabled(false);
    }
    let resolver = new_resolver_with_consolidation(builder).await?;

    let resolution = resolver.resolve_with_write_back(&item).await;
    let artifact = &resolution.artifact;

    if let Some(path) = output {
        tokio::fs::write(path, &artifact.bytes)
            .await
            .map_err(|e| anyhow!("Cannot write {}: {}", path.display(), e))?;
    }

    // Le processus ne doit pas se terminer avant la mise à jour du cache
    if let Some(handle) = resolution.write_back {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cover not cached: {}", e),
            Err(e) => warn!("Write-back task failed: {}", e),
        }
    }

    let report = ResolveReport {
        key: resolution.key.to_string(),
        provenance: artifact.provenance.to_string(),
        bytes: artifact.len(),
        width: artifact.dimensions.map(|(w, _)| w),
        height: artifact.dimensions.map(|(_, h)| h),
        placeholder: artifact.is_placeholder(),
        output: output.map(|p| p.display().to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{} <- {} ({} bytes", report.key, report.provenance, report.bytes);
        if let (Some(w), Some(h)) = (report.width, report.height) {
            print!(", {}x{}", w, h);
        }
        println!(")");
        if let Some(path) = &report.output {
            println!("written to {}", path);
        }
    }
    Ok(())
}

fn plan(config: &Config, item: LibraryItem, offline: bool, json: bool) -> Result<()> {
    let mut builder = config.cover_resolver_builder()?;
    if offline {
        builder = builder.remote_enabled(false);
    }
    let resolver = builder.build()?;

    let (key, plan) = resolver.plan(&item);
    let report = PlanReport {
        key: key.to_string(),
        sources: plan.iter().map(CoverSource::to_string).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("key: {}", report.key);
        for (i, source) in report.sources.iter().enumerate() {
            println!("  {}. {}", i + 1, source);
        }
        println!("  {}. placeholder", report.sources.len() + 1);
    }
    Ok(())
}
