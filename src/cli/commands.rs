// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// One subcommand per evaluation task plus `init-model`.
// Flags shared by every evaluation live in `RunArgs` and are
// flattened into each subcommand.
//
// Each argument struct converts into its application config
// through `From`, so Layer 2 never sees clap types.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::init_model_use_case::InitModelConfig;
use crate::application::run_config::{
    DeviceKind, LikelihoodConfig, PairedControlConfig, RunConfig, VariantConfig,
};
use crate::infra::checkpoint::{Architecture, ModelFamily};
use crate::ml::evaluator::RetryPolicy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score elements against dinucleotide-shuffled controls and report paired metrics
    PairedControl(PairedControlArgs),

    /// Write one log-likelihood per element
    Likelihoods(LikelihoodArgs),

    /// Write allele1/allele2 log-likelihoods for each variant
    Variants(VariantArgs),

    /// Write a seeded, randomly initialised checkpoint
    InitModel(InitModelArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DeviceArg {
    Cpu,
    Wgpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu => DeviceKind::Cpu,
            DeviceArg::Wgpu => DeviceKind::Wgpu,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RetryArg {
    /// Fail the run on the first exhausted batch
    Propagate,
    /// Halve an exhausted batch once and retry
    Split,
}

impl From<RetryArg> for RetryPolicy {
    fn from(r: RetryArg) -> Self {
        match r {
            RetryArg::Propagate => RetryPolicy::Propagate,
            RetryArg::Split => RetryPolicy::SplitOnExhaustion,
        }
    }
}

/// Flags shared by every evaluation subcommand
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory with model_card.json, model.mpk and optionally tokenizer.json
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Reference genome FASTA
    #[arg(long)]
    pub genome: PathBuf,

    /// Chromosomes of the evaluation split, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub chroms: Vec<String>,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// DataLoader prefetch threads (0 = load on the scoring thread)
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    /// Seed for control generation
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Refuse forward passes whose logits exceed this many MiB
    #[arg(long)]
    pub max_logits_mib: Option<usize>,

    /// What to do when a batch exceeds the logits budget
    #[arg(long, value_enum, default_value_t = RetryArg::Split)]
    pub retry: RetryArg,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

impl From<RunArgs> for RunConfig {
    fn from(a: RunArgs) -> Self {
        RunConfig {
            checkpoint_dir: a.checkpoint_dir,
            genome:         a.genome,
            chroms:         a.chroms,
            batch_size:     a.batch_size,
            num_workers:    a.num_workers,
            seed:           a.seed,
            device:         a.device.into(),
            output_dir:     a.output_dir,
            max_logits_mib: a.max_logits_mib,
            retry:          a.retry.into(),
            progress:       a.progress,
        }
    }
}

#[derive(Args, Debug)]
pub struct PairedControlArgs {
    /// Elements TSV (chr, start, end; optional ctrl_start, ctrl_end)
    #[arg(long)]
    pub elements: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,
}

impl From<PairedControlArgs> for PairedControlConfig {
    fn from(a: PairedControlArgs) -> Self {
        PairedControlConfig { run: a.run.into(), elements: a.elements }
    }
}

#[derive(Args, Debug)]
pub struct LikelihoodArgs {
    /// Elements TSV (chr, start, end)
    #[arg(long)]
    pub elements: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,
}

impl From<LikelihoodArgs> for LikelihoodConfig {
    fn from(a: LikelihoodArgs) -> Self {
        LikelihoodConfig { run: a.run.into(), elements: a.elements }
    }
}

#[derive(Args, Debug)]
pub struct VariantArgs {
    /// Variants TSV (chr, pos, allele1, allele2), 1-based positions
    #[arg(long)]
    pub variants: PathBuf,

    /// Window length in bases, centred on the variant
    #[arg(long, default_value_t = 128)]
    pub window: usize,

    #[command(flatten)]
    pub run: RunArgs,
}

impl From<VariantArgs> for VariantConfig {
    fn from(a: VariantArgs) -> Self {
        VariantConfig { run: a.run.into(), variants: a.variants, window: a.window }
    }
}

#[derive(Args, Debug)]
pub struct InitModelArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum)]
    pub family: ModelFamily,

    #[arg(long, default_value_t = 16)]
    pub vocab_size: usize,

    /// Longest token sequence the position embedding covers
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 64)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 256)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl From<InitModelArgs> for InitModelConfig {
    fn from(a: InitModelArgs) -> Self {
        InitModelConfig {
            checkpoint_dir: a.checkpoint_dir,
            family:         a.family,
            architecture:   Architecture {
                vocab_size:  a.vocab_size,
                max_seq_len: a.max_seq_len,
                d_model:     a.d_model,
                num_heads:   a.num_heads,
                num_layers:  a.num_layers,
                d_ff:        a.d_ff,
            },
            seed: a.seed,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn paired_control_flags_convert_to_config() {
        let cli = Cli::try_parse_from([
            "dnalm-bench",
            "paired-control",
            "--elements", "e.tsv",
            "--genome", "g.fa",
            "--chroms", "chr1,chr2",
            "--retry", "propagate",
            "--device", "wgpu",
        ])
        .unwrap();
        let Commands::PairedControl(args) = cli.command else {
            panic!("wrong subcommand");
        };
        let cfg = PairedControlConfig::from(args);
        assert_eq!(cfg.run.chroms, vec!["chr1", "chr2"]);
        assert_eq!(cfg.run.retry, RetryPolicy::Propagate);
        assert_eq!(cfg.run.device, DeviceKind::Wgpu);
        assert_eq!(cfg.run.batch_size, 16);
        assert!(!cfg.run.progress);
    }

    #[test]
    fn chromosomes_are_required() {
        let parsed = Cli::try_parse_from([
            "dnalm-bench", "likelihoods", "--elements", "e.tsv", "--genome", "g.fa",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn init_model_accepts_kebab_case_family() {
        let cli = Cli::try_parse_from([
            "dnalm-bench", "init-model", "--family", "hyena-dna", "--seed", "7",
        ])
        .unwrap();
        let Commands::InitModel(args) = cli.command else {
            panic!("wrong subcommand");
        };
        let cfg = InitModelConfig::from(args);
        assert_eq!(cfg.family, ModelFamily::HyenaDna);
        assert_eq!(cfg.seed, 7);
    }
}
