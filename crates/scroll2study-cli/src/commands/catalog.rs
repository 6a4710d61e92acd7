//! Catalog commands. These work on the local database directly and do
//! not need a signed-in user.

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use scroll2study_core::{Catalog, Config, GridIndex, ProfileStore, SqliteStore};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Replace the catalog with a JSON file ({"subjects", "levels", "videos"})
    Import {
        path: PathBuf,
    },
    /// Show the grid: subjects in display order with their populated levels
    Grid,
    /// Show the video in one grid cell
    Lookup {
        subject: String,
        level: u32,
    },
}

pub fn run(action: CatalogAction, _credential: Option<String>) -> CliResult {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let policy = config.catalog.duplicate_policy;

    match action {
        CatalogAction::Import { path } => {
            let raw = std::fs::read_to_string(&path)?;
            let catalog: Catalog = serde_json::from_str(&raw)?;
            let index = GridIndex::from_catalog(&catalog, policy)?;
            store.replace_catalog(&catalog)?;
            print_json(&json!({
                "subjects": index.subjects().len(),
                "levels": index.total_levels(),
                "cells": index.len(),
            }))
        }
        CatalogAction::Grid => {
            let index = GridIndex::from_catalog(&store.load_catalog()?, policy)?;
            let rows: Vec<_> = index
                .subjects()
                .iter()
                .map(|subject| {
                    let cells: Vec<_> = index
                        .levels_for(&subject.id)
                        .into_iter()
                        .filter_map(|level| index.lookup(&subject.id, level))
                        .map(|item| json!({ "level": item.complexity_level, "videoId": item.id }))
                        .collect();
                    json!({
                        "subject": subject.id,
                        "name": subject.name,
                        "maxLevel": index.max_level(&subject.id),
                        "cells": cells,
                    })
                })
                .collect();
            print_json(&json!({ "totalLevels": index.total_levels(), "subjects": rows }))
        }
        CatalogAction::Lookup { subject, level } => {
            let index = GridIndex::from_catalog(&store.load_catalog()?, policy)?;
            match index.lookup(&subject, level) {
                Some(item) => print_json(item),
                None => Err(format!("no video at ({subject}, {level})").into()),
            }
        }
    }
}
