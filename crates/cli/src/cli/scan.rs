use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use sd_meta::{InspectionResult, find_row, keys};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{GlobalArgs, ScanArgs, build_inspector, to_json};
use crate::config::AppConfig;

/// One file of a scan, as printed with `--json`.
#[derive(Serialize)]
struct ScanReport {
    path: PathBuf,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Result(InspectionResult),
    Error(String),
}

pub async fn execute(global: GlobalArgs, args: ScanArgs) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.dir.display());
    }

    let cfg = AppConfig::load_or_default()?;
    let inspector = build_inspector(&global, &cfg)?;
    let jobs = args.jobs.unwrap_or(cfg.scan_jobs).max(1);

    let files = sd_meta::discover(&args.dir)?;
    if files.is_empty() {
        println!("No supported files found in {}", args.dir.display());
        return Ok(());
    }
    info!(count = files.len(), jobs, "Scanning");

    let reports: Vec<ScanReport> = stream::iter(files)
        .map(|path| {
            let inspector = &inspector;
            async move {
                let outcome = match inspector.inspect_file(&path).await {
                    Ok(result) => Outcome::Result(result),
                    Err(e) => {
                        warn!(path = %path.display(), "Inspection failed: {e}");
                        Outcome::Error(e.to_string())
                    }
                };
                ScanReport { path, outcome }
            }
        })
        .buffered(jobs)
        .collect()
        .await;

    if args.json {
        println!("{}", to_json(&reports, cfg.pretty)?);
        return Ok(());
    }

    println!("{:<48} {:<6} {:<10} {:<30}", "File", "Kind", "Size", "Detail");
    println!("{}", "-".repeat(96));
    for report in &reports {
        let (kind, size, detail) = summarize(&report.outcome);
        println!(
            "{:<48} {:<6} {:<10} {:<30}",
            display_name(&report.path, &args.dir),
            kind,
            size,
            detail
        );
    }
    println!("\n{} file(s) inspected.", reports.len());
    Ok(())
}

fn display_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Kind / size / one-line detail for the table view.
fn summarize(outcome: &Outcome) -> (&'static str, String, String) {
    match outcome {
        Outcome::Result(InspectionResult::Image(image)) => {
            let detail = match image.convention {
                Some(c) => format!("{c:?}"),
                None => "no metadata".to_string(),
            };
            ("image", image.size.clone(), detail)
        }
        Outcome::Result(InspectionResult::Model(model)) => {
            let size = find_row(&model.file_info, keys::FILE_SIZE)
                .and_then(|r| r.value.as_text())
                .unwrap_or("-")
                .to_string();
            let detail = match (&model.model_type, find_row(&model.file_info, keys::ERROR)) {
                (Some(name), _) => name.clone(),
                (None, Some(err)) => err.value.as_text().unwrap_or("error").to_string(),
                (None, None) => "unknown".to_string(),
            };
            ("model", size, detail)
        }
        Outcome::Error(e) => ("-", "-".to_string(), e.clone()),
    }
}
