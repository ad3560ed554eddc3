use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CONFIG: &str = "/etc/shadowcfg.toml";

#[derive(Parser)]
#[command(
    name = "shadowcfg",
    about = "Crash-safe configuration store with factory-default merging",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Override the writable snapshot directory
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Override the read-only factory default directory
    #[arg(long, global = true)]
    pub readonly_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring managed configs to a valid state (run once at boot)
    Recover(NamesArgs),
    /// Show snapshot validity without changing anything
    Status(NamesArgs),
    /// Back up a config before editing it in place
    Begin(NameArgs),
    /// Seal an edited config and drop its backup
    Commit(NameArgs),
    /// Put the backed-up config back
    Abort(NameArgs),
    /// Write a checksum sidecar for a file
    Seal(PathArgs),
    /// Verify a file against its checksum sidecar
    Check(PathArgs),
}

#[derive(Args)]
pub struct NamesArgs {
    /// Managed config names (default: all)
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recover_all() {
        let cli = Cli::try_parse_from(["shadowcfg", "recover"]).unwrap();
        if let Command::Recover(args) = cli.command {
            assert!(args.names.is_empty());
        } else { panic!("wrong command"); }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn parse_recover_subset() {
        let cli = Cli::try_parse_from(["shadowcfg", "recover", "hostapd", "network"]).unwrap();
        if let Command::Recover(args) = cli.command {
            assert_eq!(args.names, vec!["hostapd", "network"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_status_with_overrides() {
        let cli = Cli::try_parse_from([
            "shadowcfg", "status", "--config", "/tmp/s.toml", "--config-dir", "/data", "--readonly-dir", "/ro",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
        assert_eq!(cli.config, PathBuf::from("/tmp/s.toml"));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/data")));
        assert_eq!(cli.readonly_dir, Some(PathBuf::from("/ro")));
    }

    #[test]
    fn parse_begin_commit_abort() {
        for verb in ["begin", "commit", "abort"] {
            let cli = Cli::try_parse_from(["shadowcfg", verb, "hostapd"]).unwrap();
            let name = match cli.command {
                Command::Begin(a) | Command::Commit(a) | Command::Abort(a) => a.name,
                _ => panic!("wrong command"),
            };
            assert_eq!(name, "hostapd");
        }
    }

    #[test]
    fn begin_requires_name() {
        assert!(Cli::try_parse_from(["shadowcfg", "begin"]).is_err());
    }

    #[test]
    fn parse_seal_and_check() {
        let cli = Cli::try_parse_from(["shadowcfg", "seal", "/etc/x.conf"]).unwrap();
        if let Command::Seal(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("/etc/x.conf"));
        } else { panic!("wrong command"); }
        let cli = Cli::try_parse_from(["shadowcfg", "check", "/etc/x.conf"]).unwrap();
        assert!(matches!(cli.command, Command::Check(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["shadowcfg", "-v", "recover"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["shadowcfg", "--format", "json", "status"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
