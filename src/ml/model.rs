// ============================================================
// Layer 5 — Transformer Language Model
// ============================================================
// Token + position embeddings, a stack of encoder blocks and a
// vocabulary head producing logits for every position:
//
//   tokens [batch, T] → logits [batch, T, vocab]
//
// Bidirectional by default. With `causal` set every block gets
// an autoregressive attention mask, so position i only sees
// positions ≤ i. Padding is hidden through the attention mask.

use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerLmConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    /// Autoregressive attention (each position sees only its prefix)
    #[config(default = false)]
    pub causal:      bool,
}

impl TransformerLmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerLm<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let lm_head    = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        TransformerLm {
            token_embedding, position_embedding, layers,
            final_norm, lm_head,
            max_seq_len: self.max_seq_len,
            vocab_size:  self.vocab_size,
            causal:      self.causal,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads).init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1 = LayerNormConfig::new(self.d_model).init(device);
        let norm2 = LayerNormConfig::new(self.d_model).init(device);
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2 }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(
        &self,
        x:         Tensor<B, 3>,
        pad_mask:  Option<Tensor<B, 2, Bool>>,
        attn_mask: Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 3> {
        let mut input = MhaInput::self_attn(x.clone());
        if let Some(mask) = pad_mask {
            input = input.mask_pad(mask);
        }
        if let Some(mask) = attn_mask {
            input = input.mask_attn(mask);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + attn_output);
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + ffn_out)
    }
}

#[derive(Module, Debug)]
pub struct TransformerLm<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub max_seq_len:        usize,
    pub vocab_size:         usize,
    pub causal:             bool,
}

impl<B: Backend> TransformerLm<B> {
    /// tokens: [batch, seq_len], attention_mask: [batch, seq_len] (1 = real, 0 = pad)
    /// → logits: [batch, seq_len, vocab]
    pub fn forward(
        &self,
        tokens:         Tensor<B, 2, Int>,
        attention_mask: Option<Tensor<B, 2, Int>>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();
        let device = tokens.device();

        let tok_emb = self.token_embedding.forward(tokens);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        // burn masks mark the positions to hide, so padding is where the mask is 0
        let pad_mask = attention_mask.map(|mask| mask.equal_elem(0));
        let attn_mask = self
            .causal
            .then(|| generate_autoregressive_mask::<B>(batch_size, seq_len, &device));

        let mut x = tok_emb + pos_emb;
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone(), attn_mask.clone());
        }
        let x = self.final_norm.forward(x);

        self.lm_head.forward(x)
    }
}
