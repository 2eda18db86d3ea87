// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers, one use case per
// CLI subcommand.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file formats (that's Layer 4 and 6)
//   - Only workflow coordination

// Shared run settings and per-task configurations
pub mod run_config;

// Genome, model and tokenizer opened once per run
pub mod session;

// Sequence vs. shuffled control, Wilcoxon metrics
pub mod paired_control_use_case;

// One log-likelihood per element
pub mod likelihood_use_case;

// Allele likelihoods around variants
pub mod variant_use_case;

// Seeded checkpoint for end-to-end runs
pub mod init_model_use_case;
