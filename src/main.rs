use std::io::Read;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use anamnesis::config::{self, Config};
use anamnesis::ollama::{LlmClient, OllamaClient};
use anamnesis::render::{summary, value};
use anamnesis::{HealthExtractor, IntakeSession, NarrativeGenerator};

#[derive(Parser)]
#[command(name = "anamnesis")]
#[command(version = config::APP_VERSION)]
#[command(about = "Turn a patient day narrative into a structured health record")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a structured record from a narrative
    Extract {
        /// The narrative text; reads stdin when neither this nor --file is given
        narrative: Option<String>,
        /// Read the narrative from a file
        #[arg(long, conflicts_with = "narrative")]
        file: Option<std::path::PathBuf>,
        /// Print the raw-data tree instead of the card summary
        #[arg(long)]
        raw: bool,
    },
    /// Generate a synthetic patient narrative
    Generate,
    /// Generate a narrative, extract it, and show both views
    Demo,
    /// List the models installed on the Ollama server
    Models,
}

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    let client = OllamaClient::new(&config.base_url, config.request_timeout_secs);

    match cli.command {
        Commands::Extract { narrative, file, raw } => {
            let narrative = read_narrative(narrative, file)?;
            ensure_model(&client, &config.extract_model)?;
            let record = run_extraction(Box::new(client), &config.extract_model, &narrative)?;
            if raw {
                print_raw(&record)?;
            } else {
                print!("{}", summary::render_cards(&summary::summarize(&record)));
            }
            Ok(())
        }
        Commands::Generate => {
            ensure_model(&client, &config.generate_model)?;
            let generator = NarrativeGenerator::new(Box::new(client), &config.generate_model);
            let narrative = generator.generate().map_err(|e| e.to_string())?;
            println!("{narrative}");
            Ok(())
        }
        Commands::Demo => {
            ensure_model(&client, &config.extract_model)?;
            if config.generate_model != config.extract_model {
                ensure_model(&client, &config.generate_model)?;
            }
            let shared = std::sync::Arc::new(client);
            let generator =
                NarrativeGenerator::new(Box::new(shared.clone()), &config.generate_model);
            let narrative = generator.generate().map_err(|e| e.to_string())?;
            println!("Narrative\n---------\n{narrative}\n");

            let record = run_extraction(Box::new(shared), &config.extract_model, &narrative)?;
            print!("{}", summary::render_cards(&summary::summarize(&record)));
            println!("Raw data\n--------");
            print_raw(&record)?;
            Ok(())
        }
        Commands::Models => {
            let models = client.list_models().map_err(|e| e.to_string())?;
            if models.is_empty() {
                println!("No models installed.");
            } else {
                for model in models {
                    println!("{model}");
                }
            }
            Ok(())
        }
    }
}

/// Drive one submission through the intake session so the stale-data and
/// single-outstanding rules hold even in this one-shot CLI.
fn run_extraction(
    llm: Box<dyn LlmClient + Send + Sync>,
    model: &str,
    narrative: &str,
) -> Result<anamnesis::HealthRecord, String> {
    let mut session = IntakeSession::new();
    session.submit(narrative).map_err(|e| e.to_string())?;
    eprintln!("{}", session.status_line());

    let extractor = HealthExtractor::new(llm, model);
    match extractor.extract(narrative) {
        Ok(record) => {
            session.resolve_success(record.clone());
            eprintln!("{}", session.status_line());
            Ok(record)
        }
        Err(error) => {
            session.resolve_failure(error.to_string());
            Err(session.status_line())
        }
    }
}

fn read_narrative(
    narrative: Option<String>,
    file: Option<std::path::PathBuf>,
) -> Result<String, String> {
    if let Some(text) = narrative {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .map_err(|e| format!("Could not read {}: {e}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("Could not read stdin: {e}"))?;
    Ok(buffer)
}

fn ensure_model(client: &OllamaClient, model: &str) -> Result<(), String> {
    let available = client.is_model_available(model).map_err(|e| e.to_string())?;
    if !available {
        return Err(format!(
            "Model '{model}' is not installed — run `ollama pull {model}` first"
        ));
    }
    Ok(())
}

fn print_raw(record: &anamnesis::HealthRecord) -> Result<(), String> {
    let as_value = serde_json::to_value(record).map_err(|e| e.to_string())?;
    println!("{}", value::render(&as_value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inline_narrative_wins_over_everything() {
        let text = read_narrative(Some("I slept well.".to_string()), None).unwrap();
        assert_eq!(text, "I slept well.");
    }

    #[test]
    fn narrative_is_read_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Yesterday I had a headache.").unwrap();
        let text = read_narrative(None, Some(file.path().to_path_buf())).unwrap();
        assert_eq!(text, "Yesterday I had a headache.");
    }

    #[test]
    fn missing_file_is_a_readable_error() {
        let error =
            read_narrative(None, Some("/nonexistent/narrative.txt".into())).unwrap_err();
        assert!(error.contains("/nonexistent/narrative.txt"));
    }

    #[test]
    fn cli_parses_extract_with_flags() {
        let cli = Cli::parse_from(["anamnesis", "extract", "--raw", "some text"]);
        match cli.command {
            Commands::Extract { narrative, file, raw } => {
                assert_eq!(narrative.as_deref(), Some("some text"));
                assert!(file.is_none());
                assert!(raw);
            }
            _ => panic!("expected extract"),
        }
    }
}
