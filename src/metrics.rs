//! Ranking quality metrics.
//!
//! Every metric takes a ranked list, the relevant (ground-truth) items, and a
//! cutoff `k`. Only the first `min(ranked.len(), k)` entries are inspected.
//!
//! - precision@k = |ranked@k ∩ relevant| / min(|ranked|, k)
//! - recall@k = |ranked@k ∩ relevant| / |relevant|
//! - nDCG@k = DCG@k / IDCG@k, with DCG = Σ 1/log2(rank + 2) over hits
//! - AP = (Σ precision at each hit) / |relevant|
//!
//! With no relevant items, precision, recall and AP score 1.0 for an empty
//! ranked list and 0.0 otherwise.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

fn relevant_set<T: Eq + Hash>(ground_truth: &[T]) -> HashSet<&T> {
    ground_truth.iter().collect()
}

#[inline]
fn cutoff<T>(ranked: &[T], k: usize) -> &[T] {
    &ranked[..ranked.len().min(k)]
}

/// |ranked@k ∩ relevant|.
pub fn true_positives<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> usize {
    let relevant = relevant_set(ground_truth);
    cutoff(ranked, k).iter().filter(|item| relevant.contains(item)).count()
}

pub fn precision<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return if ranked.is_empty() { 1.0 } else { 0.0 };
    }
    let top = cutoff(ranked, k);
    if top.is_empty() {
        return 0.0;
    }
    true_positives(ranked, ground_truth, k) as f64 / top.len() as f64
}

pub fn recall<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return if ranked.is_empty() { 1.0 } else { 0.0 };
    }
    let relevant = relevant_set(ground_truth);
    true_positives(ranked, ground_truth, k) as f64 / relevant.len() as f64
}

/// Harmonic mean of precision and recall; 1.0 when both lists are empty.
pub fn f1_score<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    if ranked.is_empty() && ground_truth.is_empty() {
        return 1.0;
    }
    let p = precision(ranked, ground_truth, k);
    let r = recall(ranked, ground_truth, k);
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

pub fn ndcg<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    let relevant = relevant_set(ground_truth);
    let gain = |i: usize| 1.0 / ((i + 2) as f64).log2();

    let dcg: f64 = cutoff(ranked, k)
        .iter()
        .enumerate()
        .filter(|(_, item)| relevant.contains(item))
        .map(|(i, _)| gain(i))
        .sum();
    let idcg: f64 = (0..relevant.len().min(k)).map(gain).sum();

    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

/// 1.0 if any relevant item appears in the top-k.
pub fn hit<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    if true_positives(ranked, ground_truth, k) > 0 {
        1.0
    } else {
        0.0
    }
}

/// 1 / (rank of the first relevant item), 0.0 if none in the top-k.
pub fn reciprocal_rank<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    let relevant = relevant_set(ground_truth);
    cutoff(ranked, k)
        .iter()
        .position(|item| relevant.contains(&item))
        .map_or(0.0, |i| 1.0 / (i + 1) as f64)
}

/// Fraction of (relevant, irrelevant) pairs within the top-k where the
/// relevant item ranks first. 0.5 when there are no such pairs.
pub fn auc<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    let relevant = relevant_set(ground_truth);
    let top = cutoff(ranked, k);
    let mut hits = 0usize;
    let mut correct_pairs = 0usize;
    for item in top {
        if relevant.contains(&item) {
            hits += 1;
        } else {
            correct_pairs += hits;
        }
    }
    let pairs = hits * (top.len() - hits);
    if pairs > 0 {
        correct_pairs as f64 / pairs as f64
    } else {
        0.5
    }
}

pub fn average_precision<T: Eq + Hash>(ranked: &[T], ground_truth: &[T], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return if ranked.is_empty() { 1.0 } else { 0.0 };
    }
    let relevant = relevant_set(ground_truth);
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, item) in cutoff(ranked, k).iter().enumerate() {
        if relevant.contains(&item) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

/// Mean reciprocal rank over queries; 0.0 with no queries.
pub fn mrr<T: Eq + Hash>(ranked_lists: &[Vec<T>], ground_truths: &[Vec<T>], k: usize) -> f64 {
    if ranked_lists.is_empty() {
        return 0.0;
    }
    let sum: f64 = ranked_lists
        .iter()
        .zip(ground_truths)
        .map(|(r, g)| reciprocal_rank(r, g, k))
        .sum();
    sum / ranked_lists.len() as f64
}

/// Metrics averaged over a set of queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub n_queries: usize,
    pub k: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub ndcg: f64,
    pub hit_rate: f64,
    pub mrr: f64,
    pub map: f64,
    pub auc: f64,
    /// Total true positives, summed rather than averaged.
    pub tp: usize,
}

/// Average every metric over paired `(ranked, ground_truth)` queries.
/// Unpaired trailing entries are ignored.
pub fn compute_scores<T: Eq + Hash>(
    ranked_lists: &[Vec<T>],
    ground_truths: &[Vec<T>],
    k: usize,
) -> MetricsSummary {
    let mut summary = MetricsSummary {
        k,
        ..MetricsSummary::default()
    };
    for (ranked, truth) in ranked_lists.iter().zip(ground_truths) {
        summary.n_queries += 1;
        summary.precision += precision(ranked, truth, k);
        summary.recall += recall(ranked, truth, k);
        summary.f1 += f1_score(ranked, truth, k);
        summary.ndcg += ndcg(ranked, truth, k);
        summary.hit_rate += hit(ranked, truth, k);
        summary.mrr += reciprocal_rank(ranked, truth, k);
        summary.map += average_precision(ranked, truth, k);
        summary.auc += auc(ranked, truth, k);
        summary.tp += true_positives(ranked, truth, k);
    }
    if summary.n_queries > 0 {
        let n = summary.n_queries as f64;
        summary.precision /= n;
        summary.recall /= n;
        summary.f1 /= n;
        summary.ndcg /= n;
        summary.hit_rate /= n;
        summary.mrr /= n;
        summary.map /= n;
        summary.auc /= n;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn boundary_example() {
        let ranked = ["A", "B", "C"];
        let relevant = ["B", "D"];
        assert!((precision(&ranked, &relevant, 3) - 1.0 / 3.0).abs() < EPS);
        assert!((recall(&ranked, &relevant, 3) - 0.5).abs() < EPS);
        assert_eq!(hit(&ranked, &relevant, 3), 1.0);
        assert!((reciprocal_rank(&ranked, &relevant, 3) - 0.5).abs() < EPS);
        assert_eq!(true_positives(&ranked, &relevant, 3), 1);
    }

    #[test]
    fn cutoff_is_min_of_len_and_k() {
        let ranked = [1u32, 2];
        let relevant = [1u32];
        // Only two entries exist, so precision divides by 2, not 10.
        assert!((precision(&ranked, &relevant, 10) - 0.5).abs() < EPS);
        assert_eq!(hit(&ranked[1..], &relevant, 10), 0.0);
        assert_eq!(reciprocal_rank(&[2u32, 1], &relevant, 1), 0.0);
    }

    #[test]
    fn empty_ground_truth() {
        let empty: [u32; 0] = [];
        assert_eq!(precision(&empty, &empty, 5), 1.0);
        assert_eq!(recall(&empty, &empty, 5), 1.0);
        assert_eq!(average_precision(&empty, &empty, 5), 1.0);
        assert_eq!(f1_score(&empty, &empty, 5), 1.0);
        assert_eq!(precision(&[1u32], &empty, 5), 0.0);
        assert_eq!(recall(&[1u32], &empty, 5), 0.0);
        assert_eq!(average_precision(&[1u32], &empty, 5), 0.0);
        assert_eq!(ndcg(&[1u32], &empty, 5), 0.0);
    }

    #[test]
    fn ndcg_perfect_and_partial() {
        let relevant = [1u32, 2];
        assert!((ndcg(&[1u32, 2, 3], &relevant, 3) - 1.0).abs() < EPS);

        // Hit only at rank 2: (1/log2 3) / (1 + 1/log2 3).
        let g = 1.0 / 3f64.log2();
        assert!((ndcg(&[3u32, 1], &relevant, 3) - g / (1.0 + g)).abs() < EPS);
    }

    #[test]
    fn auc_counts_ordered_pairs() {
        let relevant = [1u32];
        assert_eq!(auc(&[1u32, 2, 3], &relevant, 3), 1.0);
        assert_eq!(auc(&[2u32, 3, 1], &relevant, 3), 0.0);
        assert_eq!(auc(&[2u32, 1, 3], &relevant, 3), 0.5);
        // No irrelevant items: no pairs.
        assert_eq!(auc(&[1u32], &relevant, 3), 0.5);
    }

    #[test]
    fn average_precision_divides_by_relevant_count() {
        let relevant = [1u32, 2, 3, 4];
        // Hits at ranks 1 and 3: (1/1 + 2/3) / 4.
        let ap = average_precision(&[1u32, 9, 2], &relevant, 3);
        assert!((ap - (1.0 + 2.0 / 3.0) / 4.0).abs() < EPS);
    }

    #[test]
    fn summary_averages_queries() {
        let ranked = vec![vec![1u32, 2], vec![3u32, 4]];
        let truth = vec![vec![1u32], vec![5u32]];
        let summary = compute_scores(&ranked, &truth, 2);
        assert_eq!(summary.n_queries, 2);
        assert_eq!(summary.k, 2);
        assert_eq!(summary.tp, 1);
        assert!((summary.hit_rate - 0.5).abs() < EPS);
        assert!((summary.mrr - 0.5).abs() < EPS);
        assert!((summary.precision - 0.25).abs() < EPS);
        assert!((mrr(&ranked, &truth, 2) - summary.mrr).abs() < EPS);

        let empty: Vec<Vec<u32>> = Vec::new();
        assert_eq!(compute_scores(&empty, &empty, 3).n_queries, 0);
        assert_eq!(mrr(&empty, &empty, 3), 0.0);
    }
}
