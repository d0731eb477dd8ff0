use serde::Serialize;

use super::sample::UNSET_LABEL;
use super::stats::{hsl_palette, round2};

#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub status: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusDistribution {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    pub total: usize,
    pub palette: Vec<String>,
    pub rows: Vec<StatusRow>,
}

/// Ticket count per raw status label, largest first. Null statuses are
/// reported under the unset label.
pub fn compute_status_distribution(status_counts: &[(Option<String>, usize)]) -> StatusDistribution {
    let mut pairs: Vec<(String, usize)> = Vec::with_capacity(status_counts.len());
    for (status, count) in status_counts {
        let label = status
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNSET_LABEL.to_string());
        match pairs.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => *c += count,
            None => pairs.push((label, *count)),
        }
    }
    pairs.sort_by(|a, b| b.1.cmp(&a.1));

    let total: usize = pairs.iter().map(|(_, c)| c).sum();
    let rows = pairs
        .iter()
        .map(|(status, count)| StatusRow {
            status: status.clone(),
            count: *count,
            percent: if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 * 100.0
            },
        })
        .collect();

    StatusDistribution {
        palette: hsl_palette(pairs.len(), 29, 55, 55),
        labels: pairs.iter().map(|(l, _)| l.clone()).collect(),
        counts: pairs.iter().map(|(_, c)| *c).collect(),
        total,
        rows,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreCount {
    pub score: u8,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SatisfactionStats {
    pub data: Vec<ScoreCount>,
    pub total: usize,
    pub avg_score: f64,
}

/// Histogram of overall survey scores 1..=5.
///
/// `total` counts every response; the average only covers scored ones.
pub fn compute_satisfaction(scores: &[Option<i64>]) -> SatisfactionStats {
    let mut data: Vec<ScoreCount> = (1..=5u8).map(|score| ScoreCount { score, count: 0 }).collect();
    let mut sum = 0i64;
    let mut scored = 0usize;

    for score in scores.iter().flatten() {
        sum += score;
        scored += 1;
        if let Some(slot) = data.iter_mut().find(|s| s.score as i64 == *score) {
            slot.count += 1;
        }
    }

    SatisfactionStats {
        data,
        total: scores.len(),
        avg_score: if scored == 0 {
            0.0
        } else {
            round2(sum as f64 / scored as f64)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_distribution_sorted_with_unset() {
        let counts = vec![
            (Some("open".to_string()), 3),
            (None, 2),
            (Some("closed".to_string()), 5),
            (Some(String::new()), 1),
        ];
        let d = compute_status_distribution(&counts);
        assert_eq!(d.labels, vec!["closed", "open", UNSET_LABEL]);
        assert_eq!(d.counts, vec![5, 3, 3]);
        assert_eq!(d.total, 11);
        assert_eq!(d.palette[1], "hsl(29 55% 55%)");
        assert!((d.rows[0].percent - 500.0 / 11.0).abs() < 1e-10);
    }

    #[test]
    fn test_status_distribution_empty() {
        let d = compute_status_distribution(&[]);
        assert_eq!(d.total, 0);
        assert!(d.labels.is_empty());
        assert!(d.rows.is_empty());
    }

    #[test]
    fn test_satisfaction() {
        let scores = vec![Some(5), Some(4), Some(4), None, Some(1), Some(9)];
        let s = compute_satisfaction(&scores);
        assert_eq!(s.total, 6);
        let counts: Vec<usize> = s.data.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 2, 1]);
        // (5 + 4 + 4 + 1 + 9) / 5
        assert_eq!(s.avg_score, 4.6);
    }

    #[test]
    fn test_satisfaction_empty() {
        let s = compute_satisfaction(&[]);
        assert_eq!(s.total, 0);
        assert_eq!(s.avg_score, 0.0);
        assert_eq!(s.data.len(), 5);
    }
}
