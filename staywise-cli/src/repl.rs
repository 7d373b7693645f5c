//! Interactive REPL and single-question mode.

use staywise_core::{AppConfig, ChatTurn, HotelAssistant, TurnOutcome, create_provider};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Wire the generator and fact source from configuration.
///
/// Missing generator credentials are fatal; a missing fact-source key only
/// switches searches to placeholder data.
pub(crate) fn build_assistant(config: &AppConfig) -> anyhow::Result<Arc<HotelAssistant>> {
    let generator = create_provider(&config.llm)?;
    let assistant = HotelAssistant::from_config(config, generator)?;
    Ok(Arc::new(assistant))
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_ascii_lowercase().as_str(), "exit" | "quit")
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("\n\x1b[1;32mStaywise:\x1b[0m {}", outcome.display_text());
    if let Some(reasoning) = outcome.reasoning() {
        println!("\x1b[2m[Reasoning: {}]\x1b[0m", reasoning);
    }
    println!();
}

/// Run the assistant in interactive REPL mode.
pub async fn run_interactive(config: &AppConfig) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;

    println!("\x1b[1;32m  Staywise\x1b[0m  hotel assistant");
    println!(
        "  Model: {} | Hotel data: {}",
        assistant.model_name(),
        if assistant.has_live_facts() {
            "live"
        } else {
            "placeholder"
        }
    );
    println!("  Type 'exit' or 'quit' to leave\n");

    let mut history: Vec<ChatTurn> = Vec::new();
    let stdin = io::stdin();
    loop {
        print!("\x1b[1;34mYou: \x1b[0m");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            println!("Goodbye!");
            break;
        }

        match assistant.chat(input, &history).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                history.push(ChatTurn::user(input));
                history.push(ChatTurn::assistant(outcome.display_text()));
            }
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
            }
        }
    }

    Ok(())
}

/// Answer one question and exit.
pub async fn run_single_question(query: &str, config: &AppConfig) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    let outcome = assistant.chat(query, &[]).await?;
    println!("{}", outcome.display_text());
    Ok(())
}
