use ads_vectordb::distance::normalize_vector;
use async_trait::async_trait;

use super::TextEmbedder;
use crate::error::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic feature-hashing embedder for offline runs and tests.
///
/// Each lowercase alphanumeric token lands in one signed bucket; the vector
/// is L2-normalized. Equal texts always produce equal vectors, and texts
/// sharing more tokens end up closer.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return v;
        }
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(&token.to_lowercase());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        normalize_vector(&mut v);
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(FNV_OFFSET, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ads_vectordb::distance::l2_squared;

    #[test]
    fn test_deterministic_and_normalized() {
        let e = HashingEmbedder::new(64);
        let a = e.embed_sync("Summer sale on running shoes");
        let b = e.embed_sync("summer SALE on running shoes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_tokens_are_closer() {
        let e = HashingEmbedder::new(256);
        let q = e.embed_sync("running shoes sale");
        let near = e.embed_sync("running shoes on sale today");
        let far = e.embed_sync("cloud database hosting");
        assert!(l2_squared(&q, &near) < l2_squared(&q, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(8);
        assert_eq!(e.embed_sync("  ...  "), vec![0.0; 8]);
    }
}
