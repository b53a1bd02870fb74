//! cc-post - Publish one message to several social platforms

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use libcrosschannel::config::{self, Config};
use libcrosschannel::logging::LoggingConfig;
use libcrosschannel::publisher::{
    DispatchMode, OutcomeStatus, PublishOutcome, PublishRequest, Publisher,
};
use libcrosschannel::{CrossChannelError, Registry, Result, SessionStore};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "cc-post")]
#[command(version, about = "Publish one message to several social platforms")]
#[command(long_about = r#"Publish one message to several social platforms.

Each target is authenticated and published independently: a failure on one
platform is reported and the remaining platforms are still attempted.

EXAMPLES:
    # Post to the platforms listed in [defaults] platforms
    cc-post "Hello from everywhere"

    # Read the message from stdin
    echo "Hello" | cc-post

    # Pick targets explicitly
    cc-post --platform bluesky,mastodon "Hello"

    # JSON outcomes for scripting
    cc-post --format json "Hello" | jq '.[] | select(.status != "success")'

EXIT CODES:
    0 - Every target succeeded
    1 - At least one target failed to publish (or configuration error)
    2 - At least one target failed to authenticate
    3 - Invalid input (empty content, bad arguments)
"#)]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Target specific platform(s) (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    platform: Vec<String>,

    /// Configuration file
    #[arg(short, long, env = "CROSSCHANNEL_CONFIG")]
    config: Option<PathBuf>,

    /// Dispatch to all targets at once
    #[arg(long)]
    concurrent: bool,

    /// Per-call timeout in seconds (overrides [defaults] timeout_secs)
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let format = OutputFormat::parse(&cli.format)?;
    let text = read_content(cli.content)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => config::resolve_config_path()?,
    };
    let config = Config::load_from_path(&config_path)?;

    let targets = if cli.platform.is_empty() {
        config.default_targets()
    } else {
        cli.platform
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    };
    if targets.is_empty() {
        return Err(CrossChannelError::InvalidInput(
            "No target platforms: pass --platform or configure [defaults] platforms".to_string(),
        ));
    }

    let store = SessionStore::from_config(&config)?;
    let registry = Registry::from_config(&config, store)?;
    let mut publisher = Publisher::from_config(&config, registry);
    if cli.concurrent {
        publisher = publisher.with_mode(DispatchMode::Concurrent);
    }
    if let Some(secs) = cli.timeout {
        publisher = publisher.with_timeout(Duration::from_secs(secs));
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning remaining targets");
            on_interrupt.cancel();
        }
    });

    let request = PublishRequest::new(text, targets);
    let outcomes = publisher.dispatch_with_cancel(&request, &cancel).await;

    print_outcomes(&outcomes, format)?;

    Ok(exit_code(&outcomes, cancel.is_cancelled()))
}

/// Read the message from the argument or from piped stdin
fn read_content(content: Option<String>) -> Result<String> {
    let text = match content {
        Some(text) => text,
        None => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(CrossChannelError::InvalidInput(
                    "No content provided. Pass it as an argument or pipe it via stdin".to_string(),
                ));
            }
            let mut buffer = String::new();
            stdin
                .lock()
                .read_to_string(&mut buffer)
                .map_err(|e| CrossChannelError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            // Drop the newline that `echo` appends, keep interior newlines
            buffer.trim_end_matches(['\n', '\r']).to_string()
        }
    };

    if text.trim().is_empty() {
        return Err(CrossChannelError::InvalidInput(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(CrossChannelError::InvalidInput(format!(
                "Invalid format: '{}'. Valid options: text, json",
                s
            ))),
        }
    }
}

fn print_outcomes(outcomes: &[PublishOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(outcomes).map_err(|e| {
                CrossChannelError::InvalidInput(format!("Failed to encode outcomes: {}", e))
            })?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for outcome in outcomes {
                if outcome.is_success() {
                    println!("{}", outcome.message());
                } else {
                    eprintln!("{}", outcome.message());
                }
            }
        }
    }
    Ok(())
}

fn exit_code(outcomes: &[PublishOutcome], cancelled: bool) -> i32 {
    if outcomes
        .iter()
        .any(|o| o.status == OutcomeStatus::AuthFailed)
    {
        2
    } else if cancelled
        || outcomes
            .iter()
            .any(|o| o.status == OutcomeStatus::PublishFailed)
    {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcrosschannel::error::PlatformError;
    use libcrosschannel::Published;

    #[test]
    fn test_exit_code_priorities() {
        let ok = PublishOutcome::success("a", Published::posted("1"));
        let publish_failed = PublishOutcome::publish_failed("b", PlatformError::posting("no"));
        let auth_failed =
            PublishOutcome::auth_failed("c", PlatformError::Authentication("no".into()));

        assert_eq!(exit_code(&[ok.clone()], false), 0);
        assert_eq!(exit_code(&[ok.clone(), publish_failed.clone()], false), 1);
        assert_eq!(exit_code(&[publish_failed, auth_failed, ok.clone()], false), 2);
        assert_eq!(exit_code(&[ok], true), 1);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("csv").unwrap_err().exit_code(), 3);
    }

    #[test]
    fn test_content_argument_is_kept_verbatim() {
        assert_eq!(
            read_content(Some("Hello\nWorld".to_string())).unwrap(),
            "Hello\nWorld"
        );
        assert_eq!(read_content(Some("  ".to_string())).unwrap_err().exit_code(), 3);
    }
}
