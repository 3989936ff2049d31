use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::{Commands, TxCommands};

/// Top-level CLI parser for the `concord` binary.
#[derive(Debug, Parser)]
#[command(
    name = "concord",
    version,
    about = "Concord - consistent process writes across structured, graph, and vector stores"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the store files (overrides `storage.data_dir`)
    #[arg(short, long, global = true)]
    pub data_dir: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            data_dir: self.data_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use concord_core::enums::TransactionState;
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat, TxCommands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["concord", "--format", "raw", "--verbose", "health"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["concord", "detect", "--data-dir", "/tmp/c", "--quiet"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(cli.global_flags().data_dir.as_deref(), Some("/tmp/c"));
        assert!(matches!(cli.command, Commands::Detect(_)));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["concord", "--format", "table", "health"]).is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["concord", "-q", "-v", "health"]).is_err());
    }

    #[test]
    fn reconcile_flags() {
        let cli = Cli::try_parse_from(["concord", "reconcile", "--dry-run", "-y"])
            .expect("cli should parse");
        let Commands::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert!(args.dry_run);
        assert!(args.yes);
    }

    #[test]
    fn tx_list_parses_state() {
        let cli = Cli::try_parse_from(["concord", "tx", "list", "--state", "rolled_back"])
            .expect("cli should parse");
        let Commands::Tx {
            action: TxCommands::List { state },
        } = cli.command
        else {
            panic!("expected tx list");
        };
        assert_eq!(state, Some(TransactionState::RolledBack));
    }

    #[test]
    fn tx_list_rejects_unknown_state() {
        assert!(Cli::try_parse_from(["concord", "tx", "list", "--state", "done"]).is_err());
    }

    #[test]
    fn detect_scopes_are_exclusive() {
        assert!(
            Cli::try_parse_from(["concord", "detect", "--backend", "graph", "--record", "p1"])
                .is_err()
        );
    }

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["concord", "sync", "process.json"]).expect("cli should parse");
        assert!(matches!(cli.command, Commands::Sync(args) if args.file.ends_with("process.json")));

        let cli = Cli::try_parse_from(["concord", "sync", "process.json", "--embedding", "vec.json"])
            .expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Sync(args) if args.embedding.as_deref() == Some(std::path::Path::new("vec.json"))
        ));

        let cli = Cli::try_parse_from(["concord", "schema", "fix_report"]).expect("cli should parse");
        assert!(matches!(cli.command, Commands::Schema(args) if args.name == "fix_report"));
    }
}
