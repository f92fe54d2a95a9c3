use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dynloop::config::Config;
use dynloop::llm::{LlmClient, OpenAIClient};
use dynloop::registry::{HttpRegistryClient, ToolRegistry};
use dynloop::tools::{Dispatcher, ToolContext};
use dynloop::{AgentRunner, RunEvent, RunState, Session};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dynloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("dynloop.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: Cli, mut config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match cli.command {
        Commands::Run {
            prompt,
            transcript,
            max_iterations,
            model,
            registry_url,
        } => {
            if let Some(n) = max_iterations {
                config.agent.max_iterations = n;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(url) = registry_url {
                config.registry.base_url = url;
            }
            config.validate().context("Invalid configuration")?;
            handle_run_command(&prompt, transcript.as_deref(), &config, cli.verbose).await
        }
        Commands::Search { query, registry_url } => {
            if let Some(url) = registry_url {
                config.registry.base_url = url;
            }
            config.validate().context("Invalid configuration")?;
            handle_search_command(&query, &config).await
        }
        Commands::Tools => handle_tools_command(&config),
    }
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let registry: Arc<dyn ToolRegistry> = Arc::new(
        HttpRegistryClient::new(&config.registry.base_url, config.registry_timeout())
            .context("Failed to create registry client")?,
    );
    let ctx = ToolContext::interactive().with_location_url(&config.tools.location_url);

    let dispatcher = Dispatcher::standard(registry, ctx);
    Ok(match config.tool_timeout() {
        Some(limit) => dispatcher.with_tool_timeout(limit),
        None => dispatcher,
    })
}

async fn handle_run_command(prompt: &str, transcript_path: Option<&Path>, config: &Config, verbose: bool) -> Result<()> {
    info!("Running agent for prompt: {}", prompt);

    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAIClient::new(config.openai_config()).context("Failed to create LLM client")?);
    let dispatcher = Arc::new(build_dispatcher(config)?);
    let catalog = dispatcher.catalog_for(config.agent.builtins.as_slice());
    let mut session = Session::new(config.agent.system_prompt.clone(), prompt, catalog);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, verbose));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
            // a second interrupt exits without waiting for the run to unwind
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let runner = AgentRunner::with_config(llm, dispatcher, config.runner_config()).with_events(tx);
    let result = runner.run(&mut session, &cancel).await;
    drop(runner);
    let _ = printer.await;

    if let Some(path) = transcript_path {
        write_transcript(&session, path)?;
    }

    let outcome = result.context("Agent run failed")?;
    match outcome.state {
        RunState::Finished => {
            println!("{}", "----- TASK FINISHED -----".green().bold());
            println!("{}", outcome.answer.unwrap_or_default());
        }
        _ => {
            println!(
                "{} no answer after {} turns",
                "Budget exhausted:".yellow().bold(),
                outcome.iterations
            );
        }
    }
    info!(
        "Run {} ended {:?} after {} turns ({} tokens)",
        session.id,
        outcome.state,
        outcome.iterations,
        outcome.usage.total()
    );
    Ok(())
}

async fn print_events(mut rx: UnboundedReceiver<RunEvent>, verbose: bool) {
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::TurnStarted { iteration } => {
                if verbose {
                    println!("{}", format!("===== Turn {} =====", iteration).dimmed());
                }
            }
            RunEvent::TextReply { content } => {
                println!("{} {}", "Assistant:".cyan(), content);
            }
            RunEvent::ToolSelected { name, arguments, .. } => {
                println!("{} {} {}", "----- Selected Tool:".cyan(), name.bold(), "-----".cyan());
                println!("{}", arguments);
            }
            RunEvent::Observation { content, failed, .. } => {
                if failed {
                    println!("{} {}", "----- Tool Error: -----".red(), content);
                } else {
                    println!("{}", "----- Function Response: -----".cyan());
                    println!("{}", content);
                }
            }
            RunEvent::Finished { .. } | RunEvent::BudgetExhausted { .. } => {}
        }
    }
}

fn write_transcript(session: &Session, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&session.transcript).context("Failed to serialize transcript")?;
    if path == Path::new("-") {
        println!("{}", json);
    } else {
        fs::write(path, json).context(format!("Failed to write transcript to {}", path.display()))?;
        println!("{} {}", "Transcript written to".green(), path.display());
    }
    Ok(())
}

async fn handle_search_command(query: &str, config: &Config) -> Result<()> {
    info!("Searching registry for: {}", query);
    let registry = HttpRegistryClient::new(&config.registry.base_url, config.registry_timeout())
        .context("Failed to create registry client")?;

    let results = registry.search(query).await.context("Registry search failed")?;
    if results.entries.is_empty() {
        println!("{}", "No tools found".yellow());
        return Ok(());
    }

    for entry in &results.entries {
        println!(
            "{} {}",
            entry.descriptor.name.green().bold(),
            format!("({})", entry.identifier).dimmed()
        );
        if !entry.descriptor.description.is_empty() {
            println!("  {}", entry.descriptor.description);
        }
    }
    Ok(())
}

fn handle_tools_command(config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let catalog = dispatcher.catalog_for(config.agent.builtins.as_slice());
    let json = serde_json::to_string_pretty(&catalog.snapshot()).context("Failed to serialize catalog")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(cli, config).await.context("Application failed")?;

    Ok(())
}
