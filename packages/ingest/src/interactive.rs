#![allow(clippy::module_name_repetitions)]

//! Interactive TUI for the ERB map feed loader.
//!
//! Provides a menu-driven interface using `dialoguer` for loading a feed
//! without memorizing CLI flags.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use erb_map_cli_utils::{IndicatifProgress, MultiProgress};

use crate::report::{render_stats, write_dataset};
use crate::{LoadRequest, all_schemas, load_file};

/// Top-level actions available in the interactive menu.
enum LoadAction {
    LoadFeed,
    ShowStats,
    ListSchemas,
}

impl LoadAction {
    const ALL: &[Self] = &[Self::LoadFeed, Self::ShowStats, Self::ListSchemas];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::LoadFeed => "Load a feed and export JSON",
            Self::ShowStats => "Show feed statistics",
            Self::ListSchemas => "List feed schemas",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// one operation.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected load fails.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = LoadAction::ALL.iter().map(LoadAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match LoadAction::ALL[idx] {
        LoadAction::LoadFeed => {
            let request = prompt_request()?;
            let output = prompt_optional_path("Output file (empty for stdout)")?;
            let dataset = load_file(&request, load_bar(multi, &request))?;
            write_dataset(&dataset, output.as_deref())?;
        }
        LoadAction::ShowStats => {
            let request = prompt_request()?;
            let dataset = load_file(&request, load_bar(multi, &request))?;
            print!("{}", render_stats(&dataset.stats));
        }
        LoadAction::ListSchemas => {
            for schema in &all_schemas() {
                println!("{:<12} {}", schema.id(), schema.name());
            }
        }
    }

    Ok(())
}

fn load_bar(
    multi: &MultiProgress,
    request: &LoadRequest,
) -> std::sync::Arc<dyn erb_map_source::progress::ProgressCallback> {
    IndicatifProgress::load_bar(multi, &request.feed.display().to_string())
}

/// Prompts for the feed file, its schema, an optional config file, and an
/// optional color seed.
fn prompt_request() -> Result<LoadRequest, Box<dyn std::error::Error>> {
    let feed: String = Input::new()
        .with_prompt("Feed file (newline-delimited JSON)")
        .interact_text()?;

    let schemas = all_schemas();
    let schema_labels: Vec<String> = schemas
        .iter()
        .map(|s| format!("{} ({})", s.name(), s.id()))
        .collect();
    let schema_idx = Select::new()
        .with_prompt("Feed schema")
        .items(&schema_labels)
        .default(0)
        .interact()?;

    let config = prompt_optional_path("Pipeline config file (empty for defaults)")?;
    let seed = prompt_optional_u64("Color seed (empty for random)")?;

    Ok(LoadRequest {
        feed: PathBuf::from(feed.trim()),
        schema: Some(schemas[schema_idx].id().to_string()),
        schema_file: None,
        config,
        seed,
    })
}

/// Prompts the user for an optional path. Returns `None` if the input is
/// empty.
fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok((!input.is_empty()).then(|| PathBuf::from(input)))
}

/// Prompts the user for an optional `u64` value. Returns `None` if the
/// input is empty.
fn prompt_optional_u64(prompt: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}
