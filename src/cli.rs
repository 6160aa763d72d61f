//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Telegram bot that browses a Google Drive folder tree and delivers its files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (TOML, YAML or JSON). Defaults to `config.toml` in the
    /// platform config directory, if present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `drivebot_library=trace`. Overrides `RUST_LOG`.
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Skip the startup announcement to known subscribers
    #[arg(long, default_value = "false")]
    pub no_broadcast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["drivebot"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());
        assert!(!args.no_broadcast);
    }

    #[rstest]
    #[case(&["drivebot", "--config", "bot.toml"], Some("bot.toml"), None, false)]
    #[case(&["drivebot", "-c", "bot.yaml", "-l", "debug"], Some("bot.yaml"), Some("debug"), false)]
    #[case(&["drivebot", "--no-broadcast", "--log-level", "warn"], None, Some("warn"), true)]
    fn test_flags(
        #[case] argv: &[&str],
        #[case] config: Option<&str>,
        #[case] log_level: Option<&str>,
        #[case] no_broadcast: bool,
    ) {
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.config, config.map(PathBuf::from));
        assert_eq!(args.log_level.as_deref(), log_level);
        assert_eq!(args.no_broadcast, no_broadcast);
    }
}
