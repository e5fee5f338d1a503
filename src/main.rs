mod cli;
mod config;
mod dates;
mod detect;
mod error;
mod html;
mod logging;
mod model;
mod notify;
mod portal;
mod run_lock;
mod sheets;
mod workflow;

use clap::Parser;
use cli::{Command, EntidadesArgs, ProcesosArgs, RootArgs};
use config::Settings;
use error::RunError;
use model::{NotificationOutcome, RunSummary};
use notify::{Notifier, SmtpMailer};
use portal::legacy::LegacyPortal;
use portal::RamaApi;
use std::process::ExitCode;
use workflow::{Coordinator, RunOptions};

fn main() -> ExitCode {
    let args = RootArgs::parse();
    let verbose = match &args.command {
        Command::Procesos(args) => args.verbose,
        Command::Entidades(args) => args.verbose,
    };
    logging::init(verbose);

    let result = match args.command {
        Command::Procesos(args) => run_procesos(args),
        Command::Entidades(args) => run_entidades(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

fn run_procesos(args: ProcesosArgs) -> Result<(), RunError> {
    let settings = Settings::from_env()?;
    let mailer = if args.dry_run {
        None
    } else {
        Some(SmtpMailer::new(
            settings.require_mail()?,
            settings.portal.fetch_timeout,
        ))
    };
    let store = sheets::open_store(&settings.sheet, &settings.portal)
        .map_err(RunError::SourceUnavailable)?;
    let portal = RamaApi::new(&settings.portal);
    let notifier = mailer
        .as_ref()
        .map(|mailer| Notifier::new(mailer, settings.spreadsheet_id().map(str::to_string)));

    let options = RunOptions {
        cases_tab: settings.cases_tab.clone(),
        report_tab: settings.report_tab.clone(),
        max_workers: settings.run.max_workers,
        run_timeout: settings.run.run_timeout,
        stale_after_days: settings.run.stale_after_days,
        lock_path: settings.run.lock_path.clone(),
        history_path: settings.run.history_path.clone(),
        today: chrono::Local::now().date_naive(),
        dry_run: args.dry_run,
    };
    let summary = Coordinator::new(store.as_ref(), &portal, notifier, options).run()?;

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::warn!(error = %err, "cannot serialize run summary"),
        }
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "checked {} case(s): {} ok, {} failed, {} change(s), {} stale",
        summary.cases_checked,
        summary.successes(),
        summary.failures.len(),
        summary.events.len(),
        summary.stale.len()
    );
    for failure in &summary.failures {
        println!("  failed {}: {}", failure.case_id, failure.error);
    }
    if let NotificationOutcome::Failed(reason) = &summary.notification {
        println!("  digest not delivered: {reason}");
    }
}

fn run_entidades(_args: EntidadesArgs) -> Result<(), RunError> {
    let settings = Settings::from_env()?;
    let store = sheets::open_store(&settings.sheet, &settings.portal)
        .map_err(RunError::SourceUnavailable)?;
    let legacy = LegacyPortal::new(&settings.portal);
    let count = workflow::sync_entities(&legacy, store.as_ref(), &settings.entities_tab)?;
    println!("wrote {count} entities to {}", settings.entities_tab);
    Ok(())
}
