use clap::Parser;
use colored::*;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::sync::Arc;

use s3tree::cache::{ListingCache, spawn_sweeper};
use s3tree::config::Cli;
use s3tree::listing::ListingService;
use s3tree::providers::create_s3_client;
use s3tree::shell::{ShellCompleter, ShellState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("S3TREE_LOG", "off"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.browser_config();

    let provider = cli.provider.provider(cli.provider_options());
    log::info!("using provider {}", provider.name());
    let client = match provider.build_config().await {
        Ok(provider_config) => create_s3_client(provider_config, config.page_size).await,
        Err(e) => Err(e),
    };
    let client = match client {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} Failed to initialize S3 client: {e:#}", "Error:".red().bold());
            eprintln!("Make sure you have valid credentials configured.");
            std::process::exit(1);
        }
    };

    let region = client.region().to_string();
    let cache = ListingCache::new(config.cache_ttl);
    let sweeper = config
        .sweep_interval
        .map(|interval| spawn_sweeper(cache.clone(), interval));
    let service = Arc::new(ListingService::new(Arc::new(client), cache));

    println!("{}", "=".repeat(60).cyan());
    println!("{}", format!("  s3tree - {}", provider.description()).bold().cyan());
    println!(
        "{}",
        format!(
            "  region {region}, listings cached for {}s",
            config.cache_ttl.as_secs()
        )
        .cyan()
    );
    println!("{}", "=".repeat(60).cyan());
    println!();
    println!("Type 'help' for available commands or 'exit' to quit");
    println!();

    let mut state = ShellState::new(Arc::clone(&service), config.buckets.clone());

    let completer = ShellCompleter::new(state.completion_cache().clone());
    let mut rl: Editor<ShellCompleter, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(completer));

    let history_file = dirs::home_dir().map(|p| p.join(".s3tree_history"));
    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                if let Err(e) = state.execute(&line).await {
                    if e.to_string() == "exit" {
                        break;
                    }
                    eprintln!("{} {e:#}", "Error:".red().bold());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("{} {err:?}", "Error:".red().bold());
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    if let Some(handle) = sweeper {
        handle.abort();
    }
    service.cache().invalidate_all();

    println!("Goodbye!");
    Ok(())
}
