mod console;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use triage_core::{
    policy_for, Interview, InterviewContext, MatchingMode, TrainedModel, TriageConfig,
    TriageError,
};
use triage_csv::{load_all, DataFiles};

use crate::console::{write_error, write_json, write_report, ConsoleRespondent};

#[derive(Parser, Debug)]
#[command(
    name = "triage-cli",
    about = "Hỏi triệu chứng qua console và gợi ý bệnh bằng cây quyết định."
)]
struct Args {
    /// Thư mục chứa các file CSV dữ liệu.
    #[arg(short, long, default_value = "csv_files")]
    data_dir: PathBuf,
    /// File JSON ghi đè một phần cấu hình mặc định.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Chỉ chạy một phiên rồi thoát.
    #[arg(long)]
    once: bool,
    /// In báo cáo cuối phiên dạng JSON.
    #[arg(long)]
    json: bool,
    /// Bộ lọc log (cú pháp `RUST_LOG`), mặc định `warn`.
    #[arg(long)]
    log_level: Option<String>,
}

/// Cấu hình đọc từ file; trường nào bỏ trống thì giữ giá trị mặc định.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    severity_threshold: Option<f64>,
    #[serde(default)]
    test_fraction: Option<f64>,
    #[serde(default)]
    split_seed: Option<u64>,
    #[serde(default)]
    cv_folds: Option<usize>,
    #[serde(default)]
    matching: Option<MatchingMode>,
}

impl From<FileConfig> for TriageConfig {
    fn from(cfg: FileConfig) -> Self {
        let mut base = TriageConfig::default();
        if let Some(threshold) = cfg.severity_threshold {
            base.severity_threshold = threshold;
        }
        if let Some(fraction) = cfg.test_fraction {
            base.test_fraction = fraction;
        }
        if let Some(seed) = cfg.split_seed {
            base.split_seed = seed;
        }
        if let Some(folds) = cfg.cv_folds {
            base.cv_folds = folds;
        }
        if let Some(matching) = cfg.matching {
            base.matching = matching;
        }
        base
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
            let cfg: FileConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Không đọc được cấu hình {path:?}"))?;
            TriageConfig::from(cfg)
        }
        None => TriageConfig::default(),
    };
    config.validate()?;

    let data = load_all(&DataFiles::in_dir(&args.data_dir))
        .with_context(|| format!("Không tải được dữ liệu từ {:?}", args.data_dir))?;
    let model = TrainedModel::train(&data.training, &config)
        .context("Không huấn luyện được cây quyết định")?;

    if let Some(testing) = &data.testing {
        model
            .check_schema(&testing.schema)
            .context("Tập kiểm thử không dùng cùng cột với tập huấn luyện")?;
        info!(score = model.score(testing)?, "testing data scored");
    }
    for symptom in data.reference.missing_severity(model.schema()) {
        warn!(symptom, "symptom has no severity weight");
    }

    let matcher = policy_for(config.matching);
    let context = InterviewContext {
        model: &model,
        reference: &data.reference,
        matcher: matcher.as_ref(),
        config: &config,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = ConsoleRespondent::new(stdin.lock(), stdout.lock());

    loop {
        match Interview::new(context).run(&mut console) {
            Ok(report) => {
                let out = console.output();
                if args.json {
                    write_json(out, &report)?;
                } else {
                    write_report(out, &report)?;
                }
            }
            Err(TriageError::InputClosed) => {
                info!("input closed");
                break;
            }
            Err(err) => {
                error!(error = %err, "session aborted");
                write_error(console.output(), &err)?;
            }
        }
        console.output().flush()?;
        if args.once {
            break;
        }
    }

    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
