use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tracing::error;

use milk_ledger::assistant::{self, AgentKind, AssistantConfig, Conversation, LedgerClient};
use milk_ledger::config::init_tracing;

#[derive(Parser)]
#[command(
    name = "milk-assistant",
    about = "Chat with the milk ledger in plain language",
    version
)]
struct Cli {
    #[arg(long, default_value = "milk", help = "Assistant to run: milk or todo")]
    agent: AgentKind,
    #[arg(long, help = "Answer a single question and exit")]
    query: Option<String>,
    #[arg(long, action = ArgAction::SetTrue, help = "Print answers only once complete")]
    no_stream: bool,
    #[arg(long, action = ArgAction::SetTrue, help = "Emit logs as JSON")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("warn", cli.json_logs);

    let cfg = AssistantConfig::load().context("failed to load assistant configuration")?;
    let model = assistant::select_model(&cfg)?;
    let client = Arc::new(LedgerClient::new(&cfg).context("failed to build API client")?);
    let agent = assistant::build_agent(cli.agent, &cfg, client, model);

    if let Some(query) = cli.query {
        let answer = agent.run(&query).await?;
        println!("{}", answer);
        return Ok(());
    }

    chat_loop(&agent, cfg.history_turns, !cli.no_stream).await
}

async fn chat_loop(agent: &assistant::Agent, history_turns: usize, stream: bool) -> Result<()> {
    let banner = "=".repeat(50);
    println!("{}", banner);
    println!("{}", agent.name());
    println!("{}", banner);
    println!("Type your request, 'clear' to forget the conversation, or 'quit' to exit.");
    println!();

    let mut conversation = Conversation::new(history_turns);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let input = line?;
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "clear" => {
                conversation = Conversation::new(history_turns);
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        if !stream {
            match agent.run_turn(&mut conversation, input, None).await {
                Ok(answer) => println!("\nAgent: {}\n", answer),
                Err(e) => {
                    error!("agent run failed: {}", e);
                    println!("\nError: {}\n", e);
                }
            }
            continue;
        }

        print!("\nAgent: ");
        io::stdout().flush()?;
        let (tx, rx) = mpsc::channel(64);
        let printer = tokio::spawn(print_deltas(rx));
        let result = agent.run_turn(&mut conversation, input, Some(tx)).await;
        let printed = printer.await.unwrap_or(false);
        match result {
            Ok(answer) if !printed => println!("{}\n", answer),
            Ok(_) => println!("\n"),
            Err(e) => {
                error!("agent run failed: {}", e);
                println!("\nError: {}\n", e);
            }
        }
    }
    Ok(())
}

/// Echoes streamed text as it arrives; `true` if anything was printed
async fn print_deltas(mut deltas: mpsc::Receiver<String>) -> bool {
    let mut printed = false;
    let mut stdout = io::stdout();
    while let Some(text) = deltas.recv().await {
        printed = true;
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
    }
    printed
}
