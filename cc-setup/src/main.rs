//! cc-setup - First-time authentication for one platform

use std::path::PathBuf;

use clap::Parser;
use libcrosschannel::config::{self, Config};
use libcrosschannel::logging::LoggingConfig;
use libcrosschannel::oauth::OAuthCredentials;
use libcrosschannel::{
    CrossChannelError, PlatformError, PlatformId, Publisher, Registry, Result, SessionStore,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cc-setup")]
#[command(version, about = "Authenticate with a platform and store its session")]
#[command(long_about = r#"Authenticate with a platform and store its session.

Reads the platform's section from the configuration file, performs the
platform's login or credential check, and writes
<session dir>/<platform>_session.json. X needs no session: its four
OAuth 1.0a keys are only checked for completeness.

EXAMPLES:
    cc-setup bluesky
    cc-setup mastodon --config ~/cross-channel.toml
    cc-setup slack --forget

EXIT CODES:
    0 - Success
    1 - Configuration or network error
    2 - Authentication rejected by the platform
    3 - Invalid input
"#)]
struct Cli {
    /// Platform to set up (bluesky, mastodon, x, slack)
    #[arg(value_parser = parse_platform)]
    platform: PlatformId,

    /// Configuration file
    #[arg(short, long, env = "CROSSCHANNEL_CONFIG")]
    config: Option<PathBuf>,

    /// Remove the stored session instead of creating one
    #[arg(long)]
    forget: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_platform(s: &str) -> std::result::Result<PlatformId, String> {
    s.parse()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::resolve_config_path()?,
    };
    let config = Config::load_from_path(&config_path)?;
    let store = SessionStore::from_config(&config)?;
    let platform = cli.platform.as_str();

    if cli.forget {
        store.delete(platform)?;
        println!("Removed {} session", platform);
        return Ok(());
    }

    if !config.configured_platforms().contains(&platform) {
        return Err(CrossChannelError::Platform(PlatformError::Configuration(
            format!(
                "No [{}] section in {}",
                platform,
                config_path.display()
            ),
        )));
    }

    if let (PlatformId::X, Some(x)) = (cli.platform, config.x.as_ref()) {
        OAuthCredentials::from(x).validate()?;
    }

    info!("Authenticating with {}", platform);
    let registry = Registry::from_config(&config, store.clone())?;
    let publisher = Publisher::from_config(&config, registry);
    publisher.authenticate(platform).await?;

    if store.exists(platform) {
        println!(
            "Authenticated with {}; session saved to {}",
            platform,
            store.path_for(platform).display()
        );
    } else {
        println!("{} is ready (no session needed)", platform);
    }
    Ok(())
}
