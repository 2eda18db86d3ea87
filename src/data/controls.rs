// ============================================================
// Layer 4 — Paired Control Generation
// ============================================================
// Elements without an explicit control interval are paired with
// a dinucleotide-shuffled copy of themselves. The shuffle keeps
// every base count and every dinucleotide count, so GC content
// and local composition match while the order is destroyed.
//
// How it works (Altschul–Erickson via an Eulerian walk):
//   - every adjacent pair (x, y) in the sequence is an edge x → y
//   - for each base, its outgoing edges are shuffled, except the
//     last one, which stays put so the walk can never get stuck
//   - the walk starts at the first base and follows edges in
//     their new order until every edge has been used once
//
// Each element gets its own StdRng seeded with seed + index, so a
// control depends only on the element, never on which worker
// thread produced it or in what order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Shuffle `seq` preserving base and dinucleotide composition.
///
/// The result starts and ends with the same bases as `seq`.
pub fn dinucleotide_shuffle<R: Rng + ?Sized>(seq: &[u8], rng: &mut R) -> Vec<u8> {
    if seq.len() < 3 {
        return seq.to_vec();
    }

    // Distinct symbols in sorted order, so RNG consumption is stable
    let mut symbols: Vec<u8> = seq.to_vec();
    symbols.sort_unstable();
    symbols.dedup();
    let symbol_of = |b: u8| symbols.binary_search(&b).unwrap_or(0);

    // Successor positions of every occurrence, grouped by symbol
    let mut next: Vec<Vec<usize>> = vec![Vec::new(); symbols.len()];
    for (i, &b) in seq[..seq.len() - 1].iter().enumerate() {
        next[symbol_of(b)].push(i + 1);
    }

    for edges in next.iter_mut() {
        if edges.len() > 1 {
            let keep_last = edges.len() - 1;
            edges[..keep_last].shuffle(rng);
        }
    }

    let mut used = vec![0usize; symbols.len()];
    let mut out = Vec::with_capacity(seq.len());
    let mut pos = 0usize;
    out.push(seq[pos]);
    for _ in 1..seq.len() {
        let s = symbol_of(seq[pos]);
        pos = next[s][used[s]];
        used[s] += 1;
        out.push(seq[pos]);
    }
    out
}

/// Control for the element at dataset `index`.
pub fn shuffled_control(seq: &[u8], seed: u64, index: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
    dinucleotide_shuffle(seq, &mut rng)
}
