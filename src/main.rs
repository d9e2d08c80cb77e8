//! smsview - Entry Point
//!
//! Replays a fixture through the dashboard session: lists conversations, opens
//! one, scrolls through its pages and prints the thread.

use clap::Parser;
use smsview::backend::FixtureBackend;
use smsview::config::ResolvedConfig;
use smsview::logging::LogTarget;
use smsview::model::{AppError, Channel, ConversationKey, Identity, Message, MessageId, Status};
use smsview::state::{
    default_prefs_path, DashboardSession, ExpandedMessages, Filters, ScrollMetrics, StatusOutcome,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Characters shown of a collapsed long message.
const PREVIEW_CHARS: usize = 120;

/// smsview - review SMS and push-notification conversations
#[derive(Parser, Debug)]
#[command(name = "smsview")]
#[command(version)]
#[command(about = "Browse SMS and push-notification conversations from a fixture file")]
pub struct Args {
    /// Path to the JSON fixture
    pub fixture: PathBuf,

    /// Channel to browse: sms, or push (aliases: fcm, wave)
    #[arg(short, long, default_value = "sms", value_parser = clap::value_parser!(Channel))]
    pub channel: Channel,

    /// Sender or package to open; lists conversations when omitted
    #[arg(short, long)]
    pub identity: Option<String>,

    /// Extra pages to load by scrolling to the bottom
    #[arg(short, long, default_value = "0")]
    pub pages: u32,

    /// Only show messages containing this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only show messages with this status
    #[arg(long, value_parser = ["pending", "approved", "no_order"])]
    pub status: Option<String>,

    /// Change the status of this message id before printing
    #[arg(long, requires = "to", requires = "identity")]
    pub update: Option<String>,

    /// New status for --update
    #[arg(long, requires = "update", value_parser = ["approved", "no_order"])]
    pub to: Option<String>,

    /// Toggle the expanded state of this message id and save it
    #[arg(long, requires = "identity")]
    pub expand: Option<String>,

    /// Messages per page
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Fraction of the scroll height that triggers a load-more
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    pub log_stderr: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = smsview::config::load_config_with_precedence(args.config.clone())?;
        let merged = smsview::config::merge_config(config_file);
        let with_env = smsview::config::apply_env_overrides(merged)?;
        smsview::config::apply_cli_overrides(with_env, args.page_size, args.threshold).validate()?
    };

    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File(config.log_file_path.clone())
    };
    smsview::logging::init(&target)?;
    info!(config = ?config, "Configuration loaded and resolved");

    run(&args, &config)
}

fn run(args: &Args, config: &ResolvedConfig) -> Result<(), AppError> {
    let channel = args.channel;
    let filters = Filters::none()
        .with_search(args.search.clone().unwrap_or_default())
        .with_status(args.status.as_deref().and_then(Status::parse));

    let prefs_path = default_prefs_path();
    let prefs = ExpandedMessages::load(&prefs_path)?;
    let backend = FixtureBackend::load(&args.fixture)?;
    let mut session = DashboardSession::new(backend, config).with_prefs(prefs);
    session.load_pins()?;
    let mut now = Instant::now();
    session.set_filters(filters, now);

    let Some(raw_identity) = &args.identity else {
        for entry in session.conversations(channel)? {
            let pin = if entry.pinned { "*" } else { " " };
            println!(
                "{pin} {:<24} {:>5} messages {:>5} pending",
                entry.summary.identity, entry.summary.message_count, entry.summary.pending_count
            );
        }
        return Ok(());
    };

    let identity = Identity::new(raw_identity.as_str())
        .map_err(|e| AppError::Usage(format!("--identity: {e}")))?;
    session.select(Some(ConversationKey::new(channel, identity)), now);

    let bottom = ScrollMetrics {
        scroll_top: 1.0,
        scroll_height: 1.0,
        client_height: 0.0,
    };
    for _ in 0..args.pages {
        now += config.load_cooldown;
        if session.on_scroll(bottom, now).is_none() {
            break;
        }
    }

    if let (Some(raw_id), Some(raw_status)) = (&args.update, &args.to) {
        let id = message_id(raw_id)?;
        let status = Status::parse(raw_status)
            .ok_or_else(|| AppError::Usage(format!("--to: unknown status {raw_status}")))?;
        if session.update_status(&id, status) == StatusOutcome::Applied {
            println!("{id} -> {}", status.label());
        }
    }

    if let Some(raw_id) = &args.expand {
        let id = message_id(raw_id)?;
        if session.toggle_expanded(&id).is_some() {
            session.prefs().save(&prefs_path)?;
        }
    }

    for message in session.messages() {
        let expanded = session.prefs().is_expanded(message.identity(), &message.id);
        println!("{}", render_line(message, expanded));
    }
    if session.pagination().has_more() {
        println!("... more messages available (--pages)");
    }
    if let Some(banner) = session.banner().current() {
        eprintln!("{:?}: {}", banner.kind, banner.message);
    }
    Ok(())
}

fn message_id(raw: &str) -> Result<MessageId, AppError> {
    MessageId::new(raw).map_err(|e| AppError::Usage(format!("message id: {e}")))
}

/// One thread line: time, status, id, then the body (collapsed unless expanded).
fn render_line(message: &Message, expanded: bool) -> String {
    let body = if message.is_collapsible() && !expanded {
        let preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
        format!("{preview}…")
    } else {
        message.content.clone()
    };
    format!(
        "{} [{:<8}] {} {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        message.status_display,
        message.id,
        body.replace('\n', " ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["smsview", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_fixture_is_required() {
        let result = Args::try_parse_from(["smsview"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["smsview", "fixture.json"]);
        assert_eq!(args.fixture, PathBuf::from("fixture.json"));
        assert_eq!(args.channel, Channel::Sms);
        assert_eq!(args.identity, None);
        assert_eq!(args.pages, 0);
        assert_eq!(args.page_size, None);
        assert!(!args.log_stderr);
    }

    #[test]
    fn test_channel_rejects_unknown() {
        let result = Args::try_parse_from(["smsview", "f.json", "--channel", "email"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_channel_accepts_push_aliases() {
        for alias in ["wave", "fcm", "push"] {
            let args = Args::try_parse_from(["smsview", "f.json", "--channel", alias]).unwrap();
            assert_eq!(args.channel, Channel::Push, "alias {alias}");
        }
    }

    #[test]
    fn test_page_size_rejects_zero() {
        let result = Args::try_parse_from(["smsview", "f.json", "--page-size", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_update_requires_target_status() {
        let result = Args::try_parse_from(["smsview", "f.json", "-i", "MTN", "--update", "s1"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_pending_is_not_a_target_status() {
        let result = Args::try_parse_from([
            "smsview", "f.json", "-i", "MTN", "--update", "s1", "--to", "pending",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_combined_flags() {
        let args = Args::parse_from([
            "smsview",
            "fixture.json",
            "-c",
            "push",
            "-i",
            "com.wave",
            "-p",
            "3",
            "-s",
            "transfer",
            "--threshold",
            "0.5",
        ]);
        assert_eq!(args.channel, Channel::Push);
        assert_eq!(args.identity.as_deref(), Some("com.wave"));
        assert_eq!(args.pages, 3);
        assert_eq!(args.search.as_deref(), Some("transfer"));
        assert_eq!(args.threshold, Some(0.5));
    }

    #[test]
    fn test_cli_overrides_win_over_defaults() {
        use smsview::config::{apply_cli_overrides, merge_config};

        let resolved = apply_cli_overrides(merge_config(None), Some(50), Some(0.4))
            .validate()
            .unwrap();
        assert_eq!(resolved.page_size, 50);
        assert_eq!(resolved.load_more_threshold, 0.4);
    }

    #[test]
    fn test_collapsed_line_is_truncated() {
        use chrono::{TimeZone, Utc};
        use smsview::model::MessageKind;

        let message = Message::new(
            MessageId::new("s1").unwrap(),
            Utc.timestamp_opt(0, 0).unwrap(),
            "x".repeat(400),
            MessageKind::Sms {
                sender: Identity::new("MTN").unwrap(),
                sms_type: "incoming".into(),
                extracted: None,
            },
        );

        let collapsed = render_line(&message, false);
        let expanded = render_line(&message, true);

        assert!(collapsed.ends_with('…'));
        assert!(expanded.len() > collapsed.len());
        assert!(collapsed.contains("[Pending ]"));
    }
}
