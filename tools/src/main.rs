//! risk-runner: headless runner for the FAIR risk engine.
//!
//! Usage:
//!   risk-runner --input data/portfolio.json --seed 12345 --iterations 5000
//!   risk-runner --config data/engine_config.json --ipc-mode

use anyhow::{Context, Result};
use chrono::Datelike;
use fairisk_core::{
    calculation::CalculationRequest,
    config::EngineConfig,
    engine::{PopulationReport, RiskEngine},
    types::Period,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Calculate {
        request: CalculationRequest,
    },
    Assess {
        period: Period,
        risks:  Vec<CalculationRequest>,
    },
    Snapshots,
    Quit,
}

#[derive(serde::Deserialize)]
struct PortfolioFile {
    #[serde(default)]
    period: Option<Period>,
    risks:  Vec<CalculationRequest>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json_output = args.iter().any(|a| a == "--json");
    let full_curve = args.iter().any(|a| a == "--full-curve");
    let input = find_arg(&args, "--input");

    let mut config = match find_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = parse_opt::<u64>(&args, "--seed") {
        config.seed = Some(seed);
    }
    if let Some(iterations) = parse_opt::<usize>(&args, "--iterations") {
        config.iterations = iterations;
    }
    if full_curve {
        config.exposure_curve.full = true;
    }

    let mut engine = RiskEngine::new(config)?;

    if ipc_mode {
        log::info!("ipc: ready, seed={}", engine.seed());
        return run_ipc_loop(&mut engine);
    }

    let input = input.context("--input <portfolio.json> is required outside --ipc-mode")?;
    let content = std::fs::read_to_string(input).with_context(|| format!("Cannot read {input}"))?;
    let portfolio: PortfolioFile =
        serde_json::from_str(&content).with_context(|| format!("Cannot parse {input}"))?;

    let today = chrono::Utc::now();
    let period = match (parse_opt::<i32>(&args, "--year"), parse_opt::<u32>(&args, "--month")) {
        (Some(year), Some(month)) => Period::new(year, month)?,
        _ => match portfolio.period {
            Some(period) => period,
            None => Period::new(today.year(), today.month())?,
        },
    };

    if !json_output {
        println!("FAIR risk engine: risk-runner");
        println!("  input:      {input}");
        println!("  period:     {period}");
        println!("  risks:      {}", portfolio.risks.len());
        println!("  seed:       {}", engine.seed());
        println!("  iterations: {}", engine.config().iterations);
        println!();
    }

    let report = engine.assess_population(&portfolio.risks, period)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn run_ipc_loop(engine: &mut RiskEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("ipc: rejected command: {e}");
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Calculate { request } => match engine.calculate(&request) {
                Ok(result) => writeln!(stdout, "{}", serde_json::to_string(&result)?)?,
                Err(e) => write_error(&mut stdout, &e.to_string())?,
            },
            IpcCommand::Assess { period, risks } => match engine.assess_population(&risks, period) {
                Ok(report) => writeln!(stdout, "{}", serde_json::to_string(&report)?)?,
                Err(e) => write_error(&mut stdout, &e.to_string())?,
            },
            IpcCommand::Snapshots => {
                writeln!(stdout, "{}", engine.snapshots().to_json()?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(out, "{}", err_json)?;
    out.flush()?;
    Ok(())
}

fn print_summary(report: &PopulationReport) {
    let s = &report.summary;

    println!("=== POPULATION SUMMARY ({}) ===", s.period);
    println!("  snapshot:       {}", report.snapshot_id);
    println!("  included:       {}", s.total_count);
    println!("  excluded:       {}", s.excluded_count);
    println!("  failed:         {}", s.failed_count);
    println!(
        "  severity:       critical={} high={} medium={} low={}",
        s.critical_count, s.high_count, s.medium_count, s.low_count
    );
    println!("  total inherent: ${:.0}", s.total_inherent_risk);
    println!("  total residual: ${:.0}", s.total_residual_risk);
    println!(
        "  exposure:       min ${:.0} | median ${:.0} | mean ${:.2} | max ${:.0}",
        s.min_exposure, s.median_exposure, s.mean_exposure, s.max_exposure
    );
    println!("  p95 / p99:      ${:.0} / ${:.0}", s.p95_exposure, s.p99_exposure);

    println!();
    println!("=== EXPOSURE CURVE ===");
    if s.exposure_curve.is_empty() {
        println!("  (No calculated risks)");
    } else {
        for point in s.exposure_curve.points() {
            println!("  P(loss >= ${:>14.0}) = {:.3}", point.impact, point.probability);
        }
    }

    println!();
    println!("=== RISKS ===");
    for a in &report.assessments {
        println!(
            "  {:<16} {:<8} inherent ${:>12.0} | residual ${:>12.0} | p90 ${:>12.0}",
            a.risk_id, a.severity.as_str(), a.result.inherent_risk, a.result.residual_risk, a.result.simulation.p90
        );
        for warning in &a.result.warnings {
            println!("      warning: {warning}");
        }
    }
    for f in &report.failures {
        println!("  {:<16} FAILED   {}", f.risk_id, f.reason);
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_opt<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    find_arg(args, flag).and_then(|v| v.parse().ok())
}
