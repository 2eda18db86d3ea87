// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Subcommands:
//   1. `paired-control` — element vs. shuffled control metrics
//   2. `likelihoods`    — one log-likelihood per element
//   3. `variants`       — allele1/allele2 log-likelihoods
//   4. `init-model`     — seeded checkpoint for end-to-end runs

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InitModelArgs, LikelihoodArgs, PairedControlArgs, VariantArgs};

#[derive(Parser, Debug)]
#[command(
    name = "dnalm-bench",
    version = "0.1.0",
    about = "Zero-shot paired-control benchmarking of DNA language models."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. Only this layer prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::PairedControl(args) => run_paired_control(args),
            Commands::Likelihoods(args)   => run_likelihoods(args),
            Commands::Variants(args)      => run_variants(args),
            Commands::InitModel(args)     => run_init_model(args),
        }
    }
}

fn run_paired_control(args: PairedControlArgs) -> Result<()> {
    use crate::application::paired_control_use_case::PairedControlUseCase;

    tracing::info!("Paired-control evaluation of '{}'", args.elements.display());
    let report = PairedControlUseCase::new(args.into()).execute()?;

    print!("{}", report.metrics);
    Ok(())
}

fn run_likelihoods(args: LikelihoodArgs) -> Result<()> {
    use crate::application::likelihood_use_case::LikelihoodUseCase;

    let path = LikelihoodUseCase::new(args.into()).execute()?;
    println!("Likelihoods written to {}", path.display());
    Ok(())
}

fn run_variants(args: VariantArgs) -> Result<()> {
    use crate::application::variant_use_case::VariantUseCase;

    let path = VariantUseCase::new(args.into()).execute()?;
    println!("Variant likelihoods written to {}", path.display());
    Ok(())
}

fn run_init_model(args: InitModelArgs) -> Result<()> {
    use crate::application::init_model_use_case::InitModelUseCase;

    let dir = args.checkpoint_dir.clone();
    let card = InitModelUseCase::new(args.into()).execute()?;
    println!("Initialised {} checkpoint in {}", card.family, dir.display());
    Ok(())
}
