//! Demo binary: builds accuracy and AUC graphs and runs them over random batches.

use asg_metrics::asg::{DType, Value};
use asg_metrics::metrics::{accuracy, auc, AccuracyOptions, AucCurve, AucOptions, DEFAULT_NUM_THRESHOLDS};
use asg_metrics::nn::data;
use asg_metrics::runtime::{Executor, Scope};
use asg_metrics::serialization::{save_graphs, save_state, GraphBundle};
use asg_metrics::tensor::GraphContext;

use clap::Parser;
use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Accuracy / AUC metric graphs on random batches", long_about = None)]
struct Args {
    /// Number of batches to run
    #[arg(long, default_value_t = 10)]
    batches: usize,

    /// Samples per batch
    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    /// Number of classes for the accuracy metric
    #[arg(long, default_value_t = 10)]
    classes: usize,

    /// A sample counts as correct when its label is among the top k scores
    #[arg(short, long, default_value_t = 1)]
    k: usize,

    /// Curve for AUC: ROC or PR
    #[arg(long, default_value = "ROC")]
    curve: AucCurve,

    /// Thresholds used to discretize the curve
    #[arg(long, default_value_t = DEFAULT_NUM_THRESHOLDS)]
    num_thresholds: usize,

    /// How strongly the synthetic scores favour the true class
    #[arg(long, default_value_t = 1.5)]
    signal: f32,

    /// Seed of the data generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Write the built graphs and the final counters into this directory
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // ---------- 1. Graph construction ----------
    let ctx = GraphContext::shared();
    let scores = data(&ctx, "scores", vec![args.batch_size, args.classes], DType::F32)?;
    let label = data(&ctx, "label", vec![args.batch_size, 1], DType::I64)?;
    let prob = data(&ctx, "prob", vec![args.batch_size, 2], DType::F32)?;
    let binary_label = data(&ctx, "binary_label", vec![args.batch_size, 1], DType::I64)?;

    let acc = accuracy(&scores, &label, AccuracyOptions::default().with_k(args.k))?;
    let roc = auc(
        &prob,
        &binary_label,
        AucOptions::default()
            .with_curve(args.curve)
            .with_num_thresholds(args.num_thresholds),
    )?;
    {
        let ctx = ctx.borrow();
        info!(
            "[1] Graphs built: main {} ops / {} vars, startup {} ops",
            ctx.main_graph().ops.len(),
            ctx.main_graph().vars.len(),
            ctx.startup_graph().ops.len()
        );
    }

    // ---------- 2. Startup: zero the AUC counters ----------
    let executor = Executor::new();
    let mut scope = Scope::new();
    executor.run_startup(ctx.borrow().startup_graph(), &mut scope)?;
    info!("[2] Startup graph executed, {} persistable values", scope.len());

    // ---------- 3. Batches ----------
    let mut rng = StdRng::seed_from_u64(args.seed);
    let fetch = [acc.accuracy.name(), acc.correct.name(), acc.total.name(), roc.auc.name()];
    let start_time = Instant::now();

    let mut last_auc = 0.0;
    for batch in 0..args.batches {
        let feed = random_batch(&mut rng, &args);
        let out = executor.run(ctx.borrow().main_graph(), &mut scope, &feed, &fetch)?;
        let rate = out[0].scalar().unwrap_or(0.0);
        let correct = out[1].scalar().unwrap_or(0.0);
        let total = out[2].scalar().unwrap_or(0.0);
        last_auc = out[3].scalar().unwrap_or(0.0);
        println!(
            "Batch: {:<3} Accuracy@{}: {:.4} ({}/{})  {}-AUC (cumulative): {:.4}",
            batch + 1,
            args.k,
            rate,
            correct,
            total,
            args.curve,
            last_auc
        );
    }
    info!(
        "[3] {} batches in {:.2?}, final {} AUC {:.4}",
        args.batches,
        start_time.elapsed(),
        args.curve,
        last_auc
    );

    // ---------- 4. Dump ----------
    if let Some(dir) = args.dump {
        let bundle = GraphBundle::from_context(&ctx.borrow());
        save_graphs(dir.join("graphs.json"), &bundle)?;
        let saved = save_state(dir.join("state.json"), &bundle.main, &scope)?;
        info!("[4] Graphs and {} persistable values written to {}", saved, dir.display());
    }

    Ok(())
}

/// Scores that favour the true class by `signal`, plus two-column
/// probabilities for the binary task.
fn random_batch(rng: &mut StdRng, args: &Args) -> HashMap<String, Value> {
    let n = args.batch_size;
    let c = args.classes.max(1);

    let labels: Vec<i64> = (0..n).map(|_| rng.gen_range(0..c) as i64).collect();
    let scores = Array2::from_shape_fn((n, c), |(i, j)| {
        let noise: f32 = rng.gen();
        if labels[i] == j as i64 {
            noise + args.signal
        } else {
            noise
        }
    });

    let binary: Vec<i64> = (0..n).map(|_| rng.gen_range(0..2)).collect();
    let positive: Vec<f32> = binary
        .iter()
        .map(|&b| {
            let noise: f32 = rng.gen_range(-0.5..0.5);
            (0.5 + (b as f32 - 0.5) * args.signal * 0.5 + noise).clamp(0.0, 1.0)
        })
        .collect();
    let prob = Array2::from_shape_fn((n, 2), |(i, j)| if j == 1 { positive[i] } else { 1.0 - positive[i] });
    debug!("generated batch of {} samples", n);

    let column = |v: Vec<i64>| Value::I64(Array2::from_shape_fn((v.len(), 1), |(i, _)| v[i]).into_dyn());
    HashMap::from([
        ("scores".to_string(), Value::F32(scores.into_dyn())),
        ("label".to_string(), column(labels)),
        ("prob".to_string(), Value::F32(prob.into_dyn())),
        ("binary_label".to_string(), column(binary)),
    ])
}
