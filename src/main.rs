use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::info;
use translation_gateway::config::{Config, ProviderKind};
use translation_gateway::TranslationGateway;

const USAGE: &str = "Usage:
  translate [--deadline <secs>] <source> <target> <text...>
  translate --health
  translate --pairs <google|mymemory>";

enum Command {
    Translate {
        source: String,
        target: String,
        text: String,
        deadline: Option<Duration>,
    },
    Health,
    Pairs(ProviderKind),
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        Some("--health") => Ok(Command::Health),
        Some("--pairs") => {
            let provider = args.get(1).context("--pairs needs a provider name")?;
            Ok(Command::Pairs(provider.parse()?))
        }
        Some("--deadline") => {
            let secs: u64 = args
                .get(1)
                .context("--deadline needs a number of seconds")?
                .parse()
                .context("--deadline must be a whole number of seconds")?;
            match parse_args(&args[2..])? {
                Command::Translate {
                    source,
                    target,
                    text,
                    ..
                } => Ok(Command::Translate {
                    source,
                    target,
                    text,
                    deadline: Some(Duration::from_secs(secs)),
                }),
                _ => bail!("--deadline only applies to translations\n\n{}", USAGE),
            }
        }
        Some(_) if args.len() >= 3 => Ok(Command::Translate {
            source: args[0].clone(),
            target: args[1].clone(),
            text: args[2..].join(" "),
            deadline: None,
        }),
        _ => bail!("{}", USAGE),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_gateway=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    let mut config = Config::from_env()?;

    match command {
        Command::Translate {
            source,
            target,
            text,
            deadline,
        } => {
            let gateway = TranslationGateway::from_config(&config)?;
            info!("Translating {} chars {} -> {}", text.chars().count(), source, target);

            let result = match deadline {
                Some(deadline) => {
                    gateway
                        .translate_with_deadline(&text, &source, &target, deadline)
                        .await
                }
                None => gateway.translate(&text, &source, &target).await,
            }
            .context("Translation failed")?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Health => {
            let gateway = TranslationGateway::from_config(&config)?;
            let report = gateway.health_report().await;
            let healthy = report.iter().filter(|h| h.healthy).count();
            info!("{}/{} providers healthy", healthy, report.len());

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Pairs(kind) => {
            config.providers = vec![kind];
            let gateway = TranslationGateway::from_config(&config)?;
            let pairs = gateway.supported_language_pairs();
            info!("{:?} supports {} language pairs", kind, pairs.len());

            println!("{}", serde_json::to_string_pretty(&pairs)?);
        }
    }

    Ok(())
}
