//! Subcommand handlers for the Staywise CLI.

use crate::Commands;
use crate::repl::build_assistant;
use serde::Deserialize;
use staywise_core::model::{FactRecord, FactSet};
use staywise_core::{AppConfig, ClaimSet, GroundingPipeline, ValidationReport};
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, mut config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let assistant = build_assistant(&config)?;
            println!(
                "Staywise listening on http://{}:{}",
                config.server.host, config.server.port
            );
            staywise_core::gateway::run(&config.server, assistant).await?;
            Ok(())
        }
        Commands::Check { facts, response } => {
            let report = check_files(&facts, &response, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Chat => crate::repl::run_interactive(&config).await,
        Commands::Ask { query } => crate::repl::run_single_question(&query, &config).await,
    }
}

/// Accepted shapes of the `--facts` file: a bare record list, or the
/// `{city, top_hotels}` payload the search tool returns.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FactsFile {
    Records(Vec<FactRecord>),
    Payload {
        #[serde(default, alias = "location")]
        city: String,
        #[serde(alias = "records")]
        top_hotels: Vec<FactRecord>,
    },
}

impl FactsFile {
    fn into_fact_set(self) -> FactSet {
        match self {
            FactsFile::Records(records) => FactSet::from_records(records),
            FactsFile::Payload { city, top_hotels } => {
                let mut facts = FactSet::from_records(top_hotels);
                facts.location = city;
                facts
            }
        }
    }
}

fn check_files(
    facts_path: &Path,
    response_path: &Path,
    config: &AppConfig,
) -> anyhow::Result<ValidationReport> {
    let facts_raw = std::fs::read_to_string(facts_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", facts_path.display(), e))?;
    let facts: FactsFile = serde_json::from_str(&facts_raw)
        .map_err(|e| anyhow::anyhow!("Invalid facts file {}: {}", facts_path.display(), e))?;

    let response_raw = std::fs::read_to_string(response_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", response_path.display(), e))?;
    let claims = ClaimSet::parse(&response_raw).map_err(|e| {
        anyhow::anyhow!("Invalid response envelope {}: {}", response_path.display(), e)
    })?;

    let pipeline = GroundingPipeline::new(config.grounding.clone())?;
    Ok(pipeline.check(&facts.into_fact_set(), &claims))
}
