//! Distance metrics for vector similarity search.
//!
//! All metrics are expressed as distances: smaller means more similar, so
//! results from every index sort ascending.

use std::fmt;

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// Negated inner product.
    Ip,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2 => write!(f, "L2"),
            Self::Ip => write!(f, "IP"),
        }
    }
}

impl DistanceMetric {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Some(Self::L2),
            "ip" | "dot" | "inner_product" => Some(Self::Ip),
            _ => None,
        }
    }

    /// Distance between two vectors under this metric.
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => l2_squared(a, b),
            Self::Ip => -inner_product(a, b),
        }
    }
}

/// Compute inner product (dot product) of two vectors.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute L2 squared distance.
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| {
        let d = x - y;
        d * d
    }).sum()
}

/// Normalize a vector in-place (L2 normalization).
pub fn normalize_vector(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_squared_orthogonal_units() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert!((l2_squared(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_ip_distance_is_negated_dot() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert!((DistanceMetric::Ip.distance(&a, &b) + 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!(DistanceMetric::from_str_loose("L2"), Some(DistanceMetric::L2));
        assert_eq!(DistanceMetric::from_str_loose("dot"), Some(DistanceMetric::Ip));
        assert_eq!(DistanceMetric::from_str_loose("cosine"), None);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0];
        normalize_vector(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
