//! Analytic Hierarchy Process (AHP) weight derivation
//!
//! Derives relative category weights from regulator violation counts. Counts
//! are normalized, expanded into a reciprocal pairwise comparison matrix, and
//! the principal eigenvector of that matrix becomes the weight vector.
//!
//! Global invariants enforced:
//! - Output weights are non-negative and sum to 1 over the supplied categories
//! - Iteration order follows input order

use crate::config::{BioriskConfig, WeightConfig};
use crate::record::CategoryKey;
use crate::risk::CategoryWeights;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 1000;
const CONVERGENCE_EPSILON: f64 = 1e-12;

/// Consistency ratio at or below which judgments are considered acceptable
pub const ACCEPTABLE_CONSISTENCY_RATIO: f64 = 0.10;

/// Saaty random consistency index, indexed by matrix order (n = 1..=10)
const RANDOM_INDEX: [f64; 10] = [0.0, 0.0, 0.58, 0.90, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49];

/// Eigenvector result for a pairwise comparison matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AhpResult {
    pub weights: Vec<f64>,
    pub lambda_max: f64,
    pub consistency_index: f64,
    pub consistency_ratio: f64,
}

impl AhpResult {
    pub fn is_consistent(&self) -> bool {
        self.consistency_ratio <= ACCEPTABLE_CONSISTENCY_RATIO
    }
}

/// Per-category AHP weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AhpWeights {
    pub weights: IndexMap<CategoryKey, f64>,
    pub consistency_ratio: f64,
}

impl AhpWeights {
    /// Overlay the derived weights onto `base`; categories not present keep their base weight
    pub fn apply_to(&self, base: &CategoryWeights) -> CategoryWeights {
        let mut weights = *base;
        for (category, weight) in &self.weights {
            weights.set_weight(*category, *weight);
        }
        weights
    }

    /// Config file holding only a `weights` block: derived weights over the defaults
    pub fn to_config(&self) -> BioriskConfig {
        BioriskConfig {
            weights: Some(WeightConfig::from_weights(
                &self.apply_to(&CategoryWeights::default()),
            )),
            ..Default::default()
        }
    }
}

fn random_index(n: usize) -> f64 {
    RANDOM_INDEX
        .get(n.saturating_sub(1))
        .copied()
        .unwrap_or(RANDOM_INDEX[RANDOM_INDEX.len() - 1])
}

fn multiply(matrix: &[Vec<f64>], vector: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vector).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}

/// Principal eigenvector of a positive pairwise comparison matrix via power iteration
pub fn priority_vector(matrix: &[Vec<f64>]) -> Result<AhpResult> {
    let n = matrix.len();
    if n == 0 {
        anyhow::bail!("pairwise matrix must not be empty");
    }
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != n {
            anyhow::bail!(
                "pairwise matrix must be square: row {} has {} entries, expected {}",
                i,
                row.len(),
                n
            );
        }
        if let Some(v) = row.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            anyhow::bail!("pairwise matrix entries must be positive (row {} has {})", i, v);
        }
    }

    let mut vector = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITERATIONS {
        let product = multiply(matrix, &vector);
        let total: f64 = product.iter().sum();
        let next: Vec<f64> = product.iter().map(|v| v / total).collect();
        let delta = next
            .iter()
            .zip(&vector)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        vector = next;
        if delta < CONVERGENCE_EPSILON {
            break;
        }
    }

    let product = multiply(matrix, &vector);
    let lambda_max = product
        .iter()
        .zip(&vector)
        .map(|(p, w)| p / w)
        .sum::<f64>()
        / n as f64;

    let (consistency_index, consistency_ratio) = if n > 2 {
        let ci = ((lambda_max - n as f64) / (n as f64 - 1.0)).max(0.0);
        (ci, ci / random_index(n))
    } else {
        (0.0, 0.0)
    };

    Ok(AhpResult {
        weights: vector,
        lambda_max,
        consistency_index,
        consistency_ratio,
    })
}

/// Derive category weights from violation counts
///
/// Categories with a zero count get weight 0 and are left out of the
/// comparison matrix.
pub fn weights_from_counts(counts: &[(CategoryKey, u64)]) -> Result<AhpWeights> {
    if counts.is_empty() {
        anyhow::bail!("at least one category count is required");
    }
    let mut seen = std::collections::HashSet::new();
    for (category, _) in counts {
        if !seen.insert(*category) {
            anyhow::bail!("duplicate count for category {}", category);
        }
    }

    let total = counts
        .iter()
        .try_fold(0u64, |acc, (_, c)| acc.checked_add(*c))
        .ok_or_else(|| anyhow::anyhow!("violation counts overflow when summed"))?;
    if total == 0 {
        anyhow::bail!("violation counts must not all be zero");
    }

    let active: Vec<(CategoryKey, f64)> = counts
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(category, c)| (*category, *c as f64 / total as f64))
        .collect();

    let matrix: Vec<Vec<f64>> = active
        .iter()
        .map(|(_, wi)| active.iter().map(|(_, wj)| wi / wj).collect())
        .collect();
    let result = priority_vector(&matrix)?;

    let mut weights = IndexMap::new();
    for (category, count) in counts {
        let weight = if *count == 0 {
            0.0
        } else {
            active
                .iter()
                .position(|(c, _)| c == category)
                .map(|i| result.weights[i])
                .unwrap_or(0.0)
        };
        weights.insert(*category, weight);
    }

    tracing::debug!(
        categories = counts.len(),
        consistency_ratio = result.consistency_ratio,
        "derived AHP weights"
    );

    Ok(AhpWeights {
        weights,
        consistency_ratio: result.consistency_ratio,
    })
}
