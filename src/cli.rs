//! CLI argument parsing for the scheduled jobs.
//!
//! Everything that describes *where* data lives comes from the environment;
//! flags only change how a single invocation behaves.
use clap::{Parser, Subcommand};

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "rama",
    version,
    about = "Monitor Rama Judicial cases tracked in a shared spreadsheet",
    after_help = "Configuration is read from the environment (and a .env file):\n  SPREADSHEET_ID or RAMA_WORKBOOK_PATH   where the tabs live\n  SMTP_SERVER, SMTP_USERNAME, SMTP_PASSWORD, EMAIL_RECIPIENT   digest delivery\n  RAMA_LOG                               log filter (default info)\n\nExamples:\n  rama procesos\n  rama procesos --dry-run --json\n  rama entidades",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level jobs.
#[derive(Subcommand, Debug)]
pub enum Command {
    Procesos(ProcesosArgs),
    Entidades(EntidadesArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Check tracked cases, email a digest of changes, and persist state")]
pub struct ProcesosArgs {
    /// Fetch and detect only; send no mail and write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Raise the default log level to debug
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Replace the entities tab with the legacy portal's entity list")]
pub struct EntidadesArgs {
    /// Raise the default log level to debug
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_procesos_flags() {
        let args = RootArgs::try_parse_from(["rama", "procesos", "--dry-run", "--json"])
            .expect("parse");
        match args.command {
            Command::Procesos(procesos) => {
                assert!(procesos.dry_run);
                assert!(procesos.json);
                assert!(!procesos.verbose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(RootArgs::try_parse_from(["rama"]).is_err());
    }
}
