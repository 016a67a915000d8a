//! `wayfarer [CONFIG_FILE]`
//!
//! Trains the recommender on the configured catalog, prints the top
//! recommendations for the configured sample profile and writes the
//! quantized model artifact.

use std::path::PathBuf;
use std::process::ExitCode;

use wayfarer::{WayfarerConfig, format_recommendation, init_tracing, run};

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = WayfarerConfig::load(path.as_deref())?;
    init_tracing(&cfg).map_err(|e| anyhow::anyhow!(e))?;

    let report = run(&cfg)?;

    println!("Loaded {} destinations", report.destinations);
    println!(
        "Vocabulary ({} tags): {:?}",
        report.vocabulary.len(),
        report.vocabulary.tags()
    );
    println!(
        "Generated {} training pairs ({} fallback negatives)",
        report.pair_count, report.fallback_count
    );
    if let Some(last) = report.history.last() {
        match (last.val_loss, last.val_accuracy) {
            (Some(vl), Some(va)) => println!(
                "Final epoch {}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4}",
                last.epoch, last.loss, last.accuracy, vl, va
            ),
            _ => println!(
                "Final epoch {}: loss {:.4}, accuracy {:.4}",
                last.epoch, last.loss, last.accuracy
            ),
        }
    }

    println!("Top {} recommendations for {:?}:", report.recommendations.len(), cfg.query_tags);
    for rec in &report.recommendations {
        println!("{}", format_recommendation(rec));
    }
    println!(
        "Model artifact written to {} ({} bytes)",
        report.artifact_path.display(),
        report.artifact_bytes
    );
    Ok(())
}
