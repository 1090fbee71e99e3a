// ABOUTME: CLI entrypoint for the yuque-exporter command
// ABOUTME: Handles error exit codes, credential prompting and flag dispatch

use chrono::Local;
use clap::Parser;
use std::io::{self, BufRead, Write};
use yuque_exporter::{
    api::ApiClient,
    auth::{resolve_credentials, CredentialFile},
    cli::Cli,
    export::Exporter,
    git, logging,
    storage::ExportPaths,
    Error, Result,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("yuque-exporter: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn prompt_line(question: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", question)?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if answer.trim().is_empty() {
        return Err(Error::Auth("empty answer at credential prompt".into()));
    }
    Ok(answer)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let paths = ExportPaths::for_repository(&cli.output_dir, &cli.repo)?;

    if !cli.yuque && !cli.git_push {
        tracing::info!("nothing to do; pass --yuque and/or --git-push");
        return Ok(());
    }

    if cli.yuque {
        let file = match cli.credentials {
            Some(path) => CredentialFile::new(path),
            None => CredentialFile::default_location()?,
        };
        let credential = resolve_credentials(cli.namespace, cli.token, &file, prompt_line)?;

        let mut client = ApiClient::new(credential.token, Some(cli.api_base))?
            .with_retries(cli.retries, 500);
        if cli.no_throttle {
            client = client.disable_throttle();
        } else if let Some((min, max)) = cli.throttle_ms {
            client = client.with_throttle(min, max);
        }

        let report = Exporter::new(&client, &client, paths.clone())
            .dump_repository(&credential.namespace, &cli.repo)?;
        if !report.is_complete() {
            tracing::warn!(
                failed = ?report.failed,
                "some documents were not exported; rerun to retry them"
            );
        }
    }

    if cli.git_push {
        let message = git::commit_message(Local::now().date_naive());
        git::commit_and_push(&paths.export_dir, &message, &cli.remote)?;
    }

    Ok(())
}
