//! deptrack web server
//!
//! Department records behind role-gated sessions.

use clap::Parser;
use deptrack_core::{init_logging, DeptrackConfig};
use deptrack_web::{DeptrackServerBuilder, WebConfig};
use std::path::PathBuf;
use tracing::info;

/// deptrack web server - department records with an audited session trail
#[derive(Parser)]
#[command(name = "deptrack-web")]
#[command(about = "Serve the deptrack JSON API")]
#[command(version)]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Database URL, e.g. sqlite:instance/app.db
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Write the resolved settings as TOML to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut WebConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.dev {
            config.dev_mode = true;
        }
        if let Some(url) = self.database_url {
            config.database_url = Some(url);
        }
        config.config_file = self.config;
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = match DeptrackConfig::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(level) = &args.log_level {
        settings.logging.level = level.clone();
    }

    if let Some(path) = &args.write_default_config {
        if let Err(e) = settings.save_to_file(path) {
            eprintln!("Failed to write configuration: {}", e);
            std::process::exit(1);
        }
        println!("Configuration written to {}", path.display());
        return;
    }

    if let Err(e) = init_logging(&settings.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut config = WebConfig::from_settings(&settings);
    args.apply(&mut config);
    info!(database = ?config.database_url, "Configuration loaded");

    let server = match DeptrackServerBuilder::from_config(config)
        .build_with(settings)
        .await
    {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("Server failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["deptrack-web"]);
        assert!(args.host.is_none());
        assert!(args.port.is_none());
        assert!(!args.dev);
        assert!(args.write_default_config.is_none());

        let args = Args::parse_from(["deptrack-web", "--host", "0.0.0.0", "--port", "3000", "--dev"]);
        let mut config = WebConfig::default();
        args.apply(&mut config);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.dev_mode);
    }

    #[test]
    fn test_write_default_config_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deptrack.toml");
        let args = Args::parse_from([
            "deptrack-web",
            "--write-default-config",
            path.to_str().unwrap(),
        ]);
        let target = args.write_default_config.unwrap();
        assert_eq!(target, path);

        DeptrackConfig::default().save_to_file(&target).unwrap();
        let written = DeptrackConfig::from_file(&target).unwrap();
        assert_eq!(written.session.max_age_hours, 24);
    }
}
