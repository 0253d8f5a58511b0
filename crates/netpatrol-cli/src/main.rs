//! `netpatrol`: command-line client for the NetPatrol service.
//!
//! # Usage
//!
//! ```text
//! netpatrol --user alice --password secret signup --name "Alice Koch"
//! netpatrol --user alice --password secret report --lat 54.18 --lon 7.88
//! netpatrol --config ~/.config/netpatrol/cli.toml list --status REPORTED
//! ```

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use netpatrol_core::model::{Coordinates, NetStatus, NewReport};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "netpatrol", about = "Report and salvage ghost nets")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the NetPatrol server (default: http://localhost:8080).
  #[arg(long, env = "NETPATROL_URL")]
  url: Option<String>,

  /// Account handle.
  #[arg(long, env = "NETPATROL_USER")]
  user: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "NETPATROL_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create an account for --user with --password.
  Signup {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    phone: Option<String>,
  },
  /// Show the authenticated account.
  Whoami,
  /// List ghost nets, newest first.
  List {
    #[arg(long)]
    status: Option<NetStatus>,
  },
  /// Nets you reported.
  Reports,
  /// Nets assigned to you for salvage.
  Assignments,
  /// Report a ghost net. Anonymous when no --user is given.
  Report {
    #[arg(long)]
    location:    Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat:         Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon:         Option<f64>,
    #[arg(long)]
    size:        Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Take on salvage of a reported net.
  Claim { id: Uuid },
  /// Mark a net you are salvaging as recovered.
  Recover { id: Uuid },
  /// Declare a net missing.
  MarkMissing { id: Uuid },
  /// Delete a net you reported.
  Delete { id: Uuid },
  /// Your report and recovery counts.
  Stats,
  /// Ask to take over salvage of a net.
  Request { net_id: Uuid },
  /// Reassignment requests you sent.
  Sent,
  /// Pending reassignment requests addressed to you.
  Incoming,
  /// Accept a reassignment request.
  Accept { id: Uuid },
  /// Reject a reassignment request.
  Reject { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve_config(
  url:      Option<String>,
  user:     Option<String>,
  password: Option<String>,
  file:     ConfigFile,
) -> ApiConfig {
  let or_file = |flag: Option<String>, from_file: String| {
    flag.or_else(|| (!from_file.is_empty()).then_some(from_file))
  };
  ApiConfig {
    base_url: or_file(url, file.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: or_file(user, file.username).unwrap_or_default(),
    password: or_file(password, file.password).unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let api_config = resolve_config(args.url, args.user, args.password, file_cfg);
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Signup { name, phone } => print(&client.signup(&name, phone.as_deref()).await?),
    Command::Whoami => print(&client.whoami().await?),
    Command::List { status } => print(&client.list(status).await?),
    Command::Reports => print(&client.my_reports().await?),
    Command::Assignments => print(&client.my_assignments().await?),
    Command::Report { location, lat, lon, size, description } => {
      let coordinates = lat
        .zip(lon)
        .map(|(latitude, longitude)| Coordinates { latitude, longitude });
      let report = NewReport { location, coordinates, estimated_size: size, description };
      print(&client.report(&report).await?)
    }
    Command::Claim { id } => print(&client.transition(id, "claim").await?),
    Command::Recover { id } => print(&client.transition(id, "recover").await?),
    Command::MarkMissing { id } => print(&client.transition(id, "mark-missing").await?),
    Command::Delete { id } => {
      client.delete(id).await?;
      eprintln!("deleted {id}");
      Ok(())
    }
    Command::Stats => print(&client.stats().await?),
    Command::Request { net_id } => print(&client.request_reassignment(net_id).await?),
    Command::Sent => print(&client.sent().await?),
    Command::Incoming => print(&client.incoming().await?),
    Command::Accept { id } => print(&client.accept(id).await?),
    Command::Reject { id } => print(&client.reject(id).await?),
  }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("rendering JSON")?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_file_which_overrides_defaults() {
    let file = ConfigFile {
      url:      "http://patrol.example:9000".into(),
      username: "alice".into(),
      password: "from-file".into(),
    };
    let cfg = resolve_config(None, None, Some("from-flag".into()), file);
    assert_eq!(cfg.base_url, "http://patrol.example:9000");
    assert_eq!(cfg.username, "alice");
    assert_eq!(cfg.password, "from-flag");

    let cfg = resolve_config(None, None, None, ConfigFile::default());
    assert_eq!(cfg.base_url, DEFAULT_URL);
    assert!(cfg.username.is_empty());
  }

  #[test]
  fn parses_report_with_negative_coordinates() {
    let args = Args::try_parse_from([
      "netpatrol", "report", "--lat", "-33.9", "--lon", "-18.4", "--size", "5m",
    ])
    .unwrap();
    match args.command {
      Command::Report { lat, lon, .. } => {
        assert_eq!(lat, Some(-33.9));
        assert_eq!(lon, Some(-18.4));
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn lat_without_lon_is_rejected() {
    assert!(Args::try_parse_from(["netpatrol", "report", "--lat", "1"]).is_err());
  }
}
