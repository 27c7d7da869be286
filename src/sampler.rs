//! Sampler
//!
//! Strategies for thinning the members of a leaf before they are stored in
//! the membership table.
use rand::rngs::StdRng;
use rand::seq::index::sample;

// A sampler reduces the members of a single leaf in place.
pub trait LeafSampler {
    /// Subsample the members of one leaf. The retained members are left in
    /// ascending order.
    fn sample(&mut self, rng: &mut StdRng, members: &mut Vec<usize>);
}

/// Keep at most `max_samples_leaf` members per leaf, drawn uniformly
/// without replacement.
pub struct MaxSamplesLeafSampler {
    max_samples_leaf: usize,
}

impl MaxSamplesLeafSampler {
    pub fn new(max_samples_leaf: usize) -> Self {
        MaxSamplesLeafSampler { max_samples_leaf }
    }
}

impl LeafSampler for MaxSamplesLeafSampler {
    fn sample(&mut self, rng: &mut StdRng, members: &mut Vec<usize>) {
        if members.len() > self.max_samples_leaf {
            let mut chosen: Vec<usize> = sample(rng, members.len(), self.max_samples_leaf)
                .into_iter()
                .map(|i| members[i])
                .collect();
            chosen.sort_unstable();
            *members = chosen;
        }
    }
}
