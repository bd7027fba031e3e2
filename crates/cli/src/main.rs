//! `hrms-import` -- upload a spreadsheet and import it into the HRMS.
//!
//! Runs the import workflow once: upload, analysis, optional column
//! overrides, dry-run preview and, with `--yes`, the import itself. The job
//! is followed until it reaches a terminal status.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default | Description                      |
//! |------------------------|----------|---------|----------------------------------|
//! | `HRMS_API_URL`         | yes      | --      | Import API base URL              |
//! | `HRMS_API_TOKEN`       | no       | --      | Bearer token                     |
//! | `HRMS_TENANT_ID`       | no       | --      | Sent as `X-Tenant-ID`            |
//! | `POLL_INTERVAL_MS`     | no       | `2000`  | Delay between progress polls     |
//! | `POLL_STALL_THRESHOLD` | no       | `5`     | Failed polls before "stalled"    |
//! | `MAX_UPLOAD_MB`        | no       | `20`    | Upload size limit                |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hrms_client::ImportApi;
use hrms_import::args::{check_file, file_upload, ImportArgs};
use hrms_import::config::ImportConfig;
use hrms_import::{report, DEFAULT_LOG_FILTER};
use hrms_workflow::ImportController;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = ImportArgs::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Import failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the import (or dry run) succeeded.
async fn run(args: ImportArgs) -> anyhow::Result<bool> {
    let config = ImportConfig::from_env()?;

    check_file(&args.file, &config.upload_policy()).await?;
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let upload = file_upload(&args.file, bytes);

    tracing::info!(
        api_url = %config.api_url,
        file = %args.file.display(),
        "Starting hrms-import",
    );

    let api = ImportApi::new(config.api_context());
    let mut controller = ImportController::new(Arc::new(api))
        .with_policy(config.upload_policy())
        .with_poller_config(config.poller_config())
        .with_page_size(args.page_size);

    // -- upload and analysis --

    let uploaded = controller.upload(upload).await?;
    println!("Uploaded {} ({} bytes)", uploaded.filename, uploaded.size_bytes);

    controller.analyze(args.entity_type.as_deref()).await?;

    for header in &args.skip {
        controller.set_mapping(header, None)?;
    }
    for (header, field) in &args.mappings {
        controller.set_mapping(header, Some(field.as_str()))?;
    }

    if let Some(editor) = controller.workflow().editor() {
        println!(
            "{}",
            report::format_mapping(editor, &controller.unmapped_required_fields())
        );
    }

    // -- dry run --

    controller.preview().await?;
    controller.set_errors_only(args.errors_only);
    controller.set_page(args.page);

    if let Some(preview) = controller.workflow().preview() {
        println!("{}", report::format_summary(&preview.summary));
        println!(
            "{}",
            report::format_rows(&controller.page_rows(), controller.view(), controller.page_count())
        );
    }

    if !args.yes {
        println!("Dry run only. Re-run with --yes to import.");
        return Ok(true);
    }

    // -- import --

    controller.open_confirm()?;
    let job_id = controller.confirm().await?;
    println!("Import job {job_id} started");

    let printer = controller.subscribe_progress().map(|mut updates| {
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let status = updates.borrow_and_update().clone();
                if let Some(line) = report::format_poll_status(&status) {
                    eprintln!("{line}");
                }
            }
        })
    });

    let finished = tokio::select! {
        result = controller.wait_for_completion() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    if let Some(printer) = printer {
        printer.abort();
    }

    let Some(result) = finished else {
        controller.reset();
        println!("Stopped following job {job_id}; it keeps running on the server.");
        return Ok(false);
    };

    let outcome = result?;
    println!("{}", report::format_outcome(&outcome));
    Ok(outcome.success)
}
