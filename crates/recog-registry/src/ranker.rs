//! Ranking raw model scores into labelled predictions

use recog_core::{ClassificationKind, Error, InferLabel, Result};

/// Number of predictions returned when the caller asks for `k == 0`
pub const DEFAULT_TOP_K: usize = 5;

/// Probabilities at or above this map to the positive (index 1) label
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Rank `scores` according to the model's classification kind
pub fn rank(
    kind: ClassificationKind,
    scores: &[f32],
    labels: &[String],
    k: usize,
) -> Result<Vec<InferLabel>> {
    match kind {
        ClassificationKind::Binary => {
            let prob = scores
                .first()
                .copied()
                .ok_or_else(|| Error::inference("binary model produced no output"))?;
            classify_binary(prob, labels)
        }
        ClassificationKind::Multi => Ok(classify_multi(scores, labels, k)),
    }
}

/// Map a single positive-class probability to one label
pub fn classify_binary(prob: f32, labels: &[String]) -> Result<Vec<InferLabel>> {
    if labels.len() < 2 {
        return Err(Error::inference(format!(
            "binary classification needs two labels, model has {}",
            labels.len()
        )));
    }

    let idx = usize::from(prob >= BINARY_THRESHOLD);
    Ok(vec![InferLabel::new(labels[idx].clone(), prob)])
}

/// Pair scores with labels and keep the `k` best.
///
/// Scores past the end of `labels` are dropped. Equal scores keep their
/// original index order. `k == 0` means `DEFAULT_TOP_K`; `k` is clamped to
/// the number of ranked entries.
pub fn classify_multi(scores: &[f32], labels: &[String], k: usize) -> Vec<InferLabel> {
    let mut ranked: Vec<InferLabel> = scores
        .iter()
        .zip(labels)
        .map(|(&prob, label)| InferLabel::new(label.clone(), prob))
        .collect();

    // Stable, so ties stay in ascending index order.
    ranked.sort_by(|a, b| b.prob.total_cmp(&a.prob));

    let k = if k == 0 { DEFAULT_TOP_K } else { k };
    ranked.truncate(k);
    ranked
}
