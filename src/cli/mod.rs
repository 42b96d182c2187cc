// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap`, hands off to Layer 2 (application), and prints the
// final summaries.
//
// Commands:
//   1. `train`    - train, checkpoint the best epoch, score test
//   2. `evaluate` - re-score the best checkpoint
//   3. `predict`  - next-day LST forecast
//   4. `generate` - synthetic observations CSV
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, GenerateArgs, PredictArgs, TrainArgs};

use crate::ml::evaluator::RegressionMetrics;

#[derive(Parser, Debug)]
#[command(
    name = "solar-lst",
    version,
    about = "Predict daily land surface temperature from solar flare intensity and sunspot numbers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on: {}", args.data);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;
    let report  = &summary.training;

    println!("Training complete. Checkpoint saved in '{}'.", checkpoint_dir);
    println!(
        "  windows: {} train / {} validation / {} test, {} features",
        summary.sizes.train, summary.sizes.val, summary.sizes.test, summary.n_features
    );
    println!(
        "  best epoch {} of {} (val_loss {:.5}){}",
        report.best_epoch,
        report.history.len(),
        report.best_val_loss,
        if report.stopped_early { ", stopped early" } else { "" }
    );
    if let Some(lr) = report.final_lr() {
        println!("  final learning rate {:.2e}", lr);
    }
    match &summary.test {
        Some(eval) => print_metrics("Test", &eval.metrics),
        None       => println!("  no test windows; test metrics skipped"),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let label = if args.all { "All windows" } else { "Test" };
    let evaluation = EvaluateUseCase::new(args.into()).execute()?;

    if let (Some(first), Some(last)) = (evaluation.records.first(), evaluation.records.last()) {
        println!("Scored {} to {}", first.date, last.date);
    }
    print_metrics(label, &evaluation.metrics);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let forecast = PredictUseCase::new(args.checkpoint_dir, args.data, args.backend).execute()?;
    println!("\nPredicted LST for {}: {:.2}", forecast.date, forecast.lst);

    // most attended day, counted back from the forecast date
    let seq_len = forecast.attention.len();
    if let Some((i, w)) = forecast
        .attention
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        println!("Most attended day: t-{} (weight {:.3})", seq_len - i, w);
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let summary = GenerateUseCase::new(&args.output, (&args).into()).execute()?;
    println!("Wrote {} rows to '{}'.", summary.rows, summary.path.display());
    Ok(())
}

fn print_metrics(label: &str, m: &RegressionMetrics) {
    println!("{} metrics over {} days:", label, m.count);
    println!("  MAE  {:.4}", m.mae);
    println!("  RMSE {:.4}", m.rmse);
    match m.mape {
        Some(v) => println!("  MAPE {:.2}%", v),
        None    => println!("  MAPE n/a"),
    }
    match m.r2 {
        Some(v) => println!("  R²   {:.4}", v),
        None    => println!("  R²   n/a"),
    }
}
