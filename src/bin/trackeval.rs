//! trackeval - score a detection file against MOTChallenge ground truth

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use trackeval_rs::io::{save_sequence, AnnotationFile};
use trackeval_rs::{matched_detections, EvaluationConfig, Evaluator, SequenceInfo};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Ground-truth annotation file (MOTChallenge gt.txt).
    #[arg(long)]
    ground_truth: PathBuf,
    /// Detection file to evaluate.
    #[arg(long)]
    detections: PathBuf,
    /// seqinfo.ini giving the sequence length.
    #[arg(long, conflicts_with = "frames")]
    seqinfo: Option<PathBuf>,
    /// Sequence length, when no seqinfo.ini is available.
    #[arg(long)]
    frames: Option<usize>,
    /// Minimum IoU for a detection to match a ground-truth box.
    #[arg(long, default_value_t = 0.5)]
    iou_threshold: f64,
    /// Report output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write per-identity coverage timelines as JSON to this path.
    #[arg(long)]
    coverage_out: Option<PathBuf>,
    /// Write the matched subset of detections to this path.
    #[arg(long)]
    matched_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let gt_file = AnnotationFile::new(&args.ground_truth)
        .with_context(|| format!("failed to load {}", args.ground_truth.display()))?;
    let det_file = AnnotationFile::new(&args.detections)
        .with_context(|| format!("failed to load {}", args.detections.display()))?;

    let info = match (&args.seqinfo, args.frames) {
        (Some(path), _) => SequenceInfo::from_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, Some(frames)) => SequenceInfo::with_frame_count(frames),
        (None, None) => {
            SequenceInfo::with_frame_count(gt_file.max_frame().max(det_file.max_frame()))
        }
    };
    info!(
        "evaluating {} over {} frames",
        if info.name.is_empty() { "sequence" } else { info.name.as_str() },
        info.frame_count
    );

    let ground_truth = gt_file.to_sequence(info.clone());
    let detections = det_file.to_sequence(info);

    let config = EvaluationConfig::new(args.iou_threshold);
    let mut evaluator = Evaluator::new(&ground_truth, &detections, config)
        .map_err(|e| anyhow!("invalid evaluation input: {}", e))?;
    evaluator.run()?;
    let evaluation = evaluator.finalize();

    match args.format {
        OutputFormat::Json => println!("{}", evaluation.report().to_json()?),
        OutputFormat::Text => print!("{}", evaluation.report()),
    }

    if let Some(path) = &args.coverage_out {
        let json = serde_json::to_string_pretty(evaluation.coverage())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote coverage timelines to {}", path.display());
    }

    if let Some(path) = &args.matched_out {
        let matched = matched_detections(&ground_truth, &detections, args.iou_threshold)?;
        save_sequence(&matched, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(
            "wrote {} matched detections to {}",
            matched.num_instances(),
            path.display()
        );
    }

    Ok(())
}
