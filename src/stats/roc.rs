//! Receiver operating characteristic curves.

/// ROC points `(fpr, tpr)` for binary `labels` ranked by `scores`.
///
/// Thresholds step through the distinct scores from high to low, so tied
/// scores move both rates at once. The curve starts at (0, 0) and ends at
/// (1, 1).
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Vec<(f64, f64)> {
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let negatives = labels.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 || labels.len() != scores.len() {
        return vec![(0.0, 0.0), (1.0, 1.0)];
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![(0.0, 0.0)];
    let (mut tp, mut fp) = (0.0, 0.0);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]] {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        points.push((fp / negatives, tp / positives));
    }

    points
}

/// Area under a curve of `(x, y)` points by the trapezoid rule.
pub fn auc_trapezoid(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[1].1 + w[0].1) / 2.0)
        .sum()
}
