use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepseek_relay::{ConfigOverrides, ModelRegistry, RelayConfig};

#[derive(Parser)]
#[command(name = "deepseek-relay")]
#[command(about = "DeepSeek request relay with context caching", long_about = None)]
struct Cli {
    /// DeepSeek model to use (overrides DEEPSEEK_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// System prompt (overrides DEEPSEEK_SYSTEM_PROMPT)
    #[arg(short, long, global = true)]
    system_prompt: Option<String>,

    /// Sampling temperature between 0.0 and 1.0 (overrides DEEPSEEK_TEMPERATURE)
    #[arg(short, long, global = true)]
    temperature: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models
    Models,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "deepseek_relay=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let registry = ModelRegistry::default();
    let mut config = RelayConfig::from_env()?;
    let overrides = ConfigOverrides {
        model: cli.model.clone(),
        system_prompt: cli.system_prompt.clone(),
        temperature: cli.temperature,
    };
    config.apply_overrides(&overrides, &registry)?;

    match cli.command {
        Commands::Models => {
            println!("Available models:");
            for model in registry.list() {
                let marker = if model.supports_caching { " [caching]" } else { "" };
                let current = if model.id == config.model { " *" } else { "" };
                println!("  - {} ({}){}{}", model.id, model.name, marker, current);
                println!("      {}", model.description);
            }
        }

        Commands::Config => {
            println!("DeepSeek relay configuration:");
            println!("  API key:        {}", config.masked_api_key());
            println!("  Model:          {}", config.model);
            println!("  System prompt:  {}", config.prompt_preview(50));
            println!("  Temperature:    {}", config.temperature);
            println!("  Max file size:  {} bytes", config.max_file_size);
            println!("  Allowed types:  {}", config.allowed_file_types.join(", "));
            println!("  Caching:        {}", config.cache.enabled);
            println!("  Default TTL:    {:?}", config.cache.default_ttl);
            println!("  Timeout:        {:?}", config.http_timeout);
            println!("  Max attempts:   {}", config.retry.max_attempts);
            println!(
                "  Backoff:        {:?} .. {:?}",
                config.retry.initial_backoff, config.retry.max_backoff
            );
        }
    }

    Ok(())
}
