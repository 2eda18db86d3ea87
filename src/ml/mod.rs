// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. Other layers hand this layer
// windows and get plain f64 scores back.
//
// What's in this layer:
//
//   model.rs             — transformer language model
//                          • token + positional embeddings
//                          • multi-head self-attention
//                            (autoregressive mask when causal)
//                          • GELU feed-forward, layer norm,
//                            residual connections
//                          • vocabulary head
//
//   tokenizer_adapter.rs — windows → padded tokens + [start, end)
//
//   adapter.rs           — the model-adapter interface
//                          {tokenize, forward_logits} and the
//                          logits budget
//
//   scoring.rs           — Masked / Causal likelihood scoring
//
//   evaluator.rs         — paired evaluation loop, accumulator,
//                          split-on-exhaustion retry
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

/// Transformer language model architecture
pub mod model;

/// Tokenizer adapter and the built-in nucleotide vocabulary
pub mod tokenizer_adapter;

/// Model-adapter trait and the transformer adapter
pub mod adapter;

/// Masked and causal scoring strategies
pub mod scoring;

/// Paired evaluator and its accumulator
pub mod evaluator;
