//! `stockroom chat`: the interactive conversation loop.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use stockroom::agent::{Agent, Outcome};
use stockroom::config::AgentConfig;
use stockroom::gateway::openai::OpenAiBackend;
use stockroom::gateway::CompletionBackend;

/// Run the chat loop until `/exit`, Ctrl+C, or Ctrl+D.
pub async fn run(config: &AgentConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = stockroom::db::open_database(&db_path)?;

    let backend = OpenAiBackend::new(&config.api)?;
    if !backend.available() {
        println!("OPENAI_API_KEY is not set; answering from the local database only.");
    }

    let mut agent = Agent::new(config, conn, backend);
    for notice in agent.prime()? {
        println!("{notice}");
    }

    let mut rl = DefaultEditor::new().context("failed to initialize readline")?;

    println!("AI agent ready. Type a message, or /help for commands.");
    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match agent.handle_line(&line).await {
                    Ok(Outcome::Exit) => break,
                    Ok(outcome) => render(&outcome),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(e) => {
                eprintln!("error: {e}");
                break;
            }
        }
    }

    Ok(())
}

fn render(outcome: &Outcome) {
    match outcome {
        Outcome::Reply(text) => println!("Assistant: {text}"),
        Outcome::Fallback { reply, reason } => {
            eprintln!("note: {reason}; answered from local data");
            println!("Assistant: {reply}");
        }
        Outcome::Notice(text) => println!("{text}"),
        Outcome::Idle | Outcome::Exit => {}
    }
}
