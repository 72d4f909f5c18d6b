use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use lms_mirror::{
    logging,
    paths::Environment,
    prompt::{AssumeDefaults, InquirePrompter, Prompter},
    replace::ReplacementEngine,
    session::{Session, SessionOptions, SessionReport},
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "lms-mirror")]
#[command(about = "Point an LM Studio installation at hf-mirror.com instead of huggingface.co")]
#[command(version)]
struct Cli {
    /// LM Studio app directory (skips automatic discovery)
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Answer every question with its default, without prompting.
    /// With --restore the restore goes ahead without asking
    #[arg(short, long)]
    yes: bool,

    /// Do not create a backup before replacing
    #[arg(long)]
    no_backup: bool,

    /// Restore a backup created by an earlier run instead of replacing
    #[arg(long, value_name = "BACKUP_DIR", conflicts_with = "no_backup")]
    restore: Option<PathBuf>,

    /// Print the session summary as JSON on stdout; other output moves to stderr
    #[arg(long)]
    json: bool,

    /// More diagnostic output on stderr (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut ui = Ui::new(cli.color, cli.no_color);
    if cli.json {
        // stdout carries only the JSON summary
        ui = ui.to_stderr();
    }

    match run(cli, &ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "session aborted");
            ui.err(format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    logging::init(cli.verbose)?;

    let env = Environment::detect()?;
    let engine = ReplacementEngine::new()?;
    let mut prompter: Box<dyn Prompter> = if cli.yes {
        Box::new(AssumeDefaults)
    } else {
        Box::new(InquirePrompter)
    };
    let options = SessionOptions {
        path: cli.path,
        skip_backup: cli.no_backup,
    };

    let session = Session::new(&env, ui, &engine, prompter.as_mut(), options);
    let report = match cli.restore {
        Some(backup) => session.restore_only(&backup)?,
        None => session.run()?,
    };

    if cli.json {
        print_json(&report)?;
    }
    Ok(())
}

fn print_json(report: &SessionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize session report")?;
    anstream::println!("{}", json);
    Ok(())
}
