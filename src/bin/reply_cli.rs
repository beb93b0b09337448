//! reply-cli: generate reply suggestions from the command line.
//!
//! Usage:
//!   reply-cli generate --text <t> [--image <path>] [--mood <m>] [--length <l>] [--count <n>]
//!   reply-cli models                               List locally installed fallback models
//!   reply-cli moods                                List available moods

use ai_reply_rust::providers::OllamaProvider;
use ai_reply_rust::{
    ApiKey, ImageAttachment, Mood, ProviderKind, ProviderRouterBuilder, ReplyLength,
    ReplyRequest, ResultSource, RouterConfig,
};
use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "generate" => cmd_generate(&args[2..]).await,
        "models" => cmd_models(&args[2..]).await,
        "moods" => {
            cmd_moods();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("reply-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"reply-cli: AI reply suggestions with cache, quota and local fallback

USAGE:
    reply-cli <COMMAND> [OPTIONS]

COMMANDS:
    generate                    Generate reply suggestions
        --text <text>           Conversation text
        --image <path>          Conversation screenshot
        --mood <mood>           Mood id or label (default: flirty)
        --length <length>       short | medium | long (default: medium)
        --count <n>             Number of suggestions, 1-5 (default: 3)
        --context <text>        Extra context for the model
        --api-key <key>         Gemini API key (else keyring, else GEMINI_API_KEY)
    models                      List locally installed fallback models
    moods                       List available moods
    version                     Show version information
    help                        Show this help message

COMMON OPTIONS:
    --config <path>             YAML configuration file

ENVIRONMENT:
    GEMINI_API_KEY              Primary provider API key
    REPLY_*                     Configuration overrides
    RUST_LOG                    Log filter (default: warn)"#
    );
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn load_config(args: &[String]) -> anyhow::Result<RouterConfig> {
    let config = match flag(args, "--config") {
        Some(path) => RouterConfig::from_file(path)
            .with_context(|| format!("cannot load configuration from {path}"))?,
        None => RouterConfig::default(),
    };
    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn cmd_generate(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;

    let mut builder = ReplyRequest::builder();
    if let Some(text) = flag(args, "--text") {
        builder = builder.text(text);
    }
    if let Some(path) = flag(args, "--image") {
        let image = ImageAttachment::from_file(path)
            .with_context(|| format!("cannot read image {path}"))?;
        builder = builder.image(image);
    }
    if let Some(mood) = flag(args, "--mood") {
        builder = builder.mood(mood.parse::<Mood>()?);
    }
    if let Some(length) = flag(args, "--length") {
        builder = builder.length(length.parse::<ReplyLength>()?);
    }
    if let Some(count) = flag(args, "--count") {
        let n: u8 = count
            .parse()
            .with_context(|| format!("--count expects a number, got '{count}'"))?;
        builder = builder.suggestion_count(n);
    }
    if let Some(context) = flag(args, "--context") {
        builder = builder.extra_context(context);
    }
    let request = builder.build()?;

    let key = ApiKey::resolve(flag(args, "--api-key"), "gemini")?;
    let router = ProviderRouterBuilder::from_config(config, key)?.build()?;

    let result = match router.handle(&request).await {
        Ok(result) => result,
        Err(e) => bail!("{e}\n(category: {:?})", e.category()),
    };

    let origin = match result.source() {
        ResultSource::Cache => "cache".to_string(),
        ResultSource::Provider(ProviderKind::Primary) => router.signals().primary,
        ResultSource::Provider(ProviderKind::Secondary) => router
            .signals()
            .secondary
            .unwrap_or_else(|| "local".to_string()),
    };
    println!("Suggestions ({} via {}):", result.text().len(), origin);
    for (i, reply) in result.text().iter().enumerate() {
        println!();
        println!("{}. {}", i + 1, reply);
    }

    let quota = router.signals().quota;
    println!();
    println!(
        "Quota: {}/{} used in the last {}s ({})",
        quota.used,
        quota.limit,
        quota.window.as_secs(),
        quota.health
    );
    Ok(())
}

async fn cmd_models(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let Some(ollama) = config.ollama else {
        bail!("no local fallback configured");
    };
    let url = ollama.base_url.clone();
    let provider = OllamaProvider::new(ollama)?;
    let models = provider
        .list_models()
        .await
        .with_context(|| format!("cannot list models at {url}"))?;
    if models.is_empty() {
        println!("No local models installed. Try `ollama pull llama3.2`.");
    } else {
        println!("Local models at {url}:");
        for m in models {
            println!("  {m}");
        }
    }
    Ok(())
}

fn cmd_moods() {
    for mood in Mood::ALL {
        println!("  {:<14} {}", mood.id(), mood.label());
    }
}
