use std::borrow::Cow;

use crate::Sample;

/// Largest Triangle Three Buckets (LTTB) downsampling algorithm.
///
/// Reduces an ordered slice of samples to exactly `threshold` samples while
/// preserving the visual shape of the data. The first and last samples are
/// always kept and every other kept sample is an original sample, never an
/// interpolated one.
///
/// Returns the input borrowed and unchanged if `threshold >= series.len()`
/// or `threshold < 3` (which includes `0`, meaning "no reduction").
pub fn downsample(series: &[Sample], threshold: usize) -> Cow<'_, [Sample]> {
    if !reduces(series.len(), threshold) {
        return Cow::Borrowed(series);
    }

    let mut sampled = Vec::with_capacity(threshold);
    select(series, threshold, |i| sampled.push(series[i]));
    Cow::Owned(sampled)
}

/// Like [`downsample`] but returns the indices of the selected samples.
///
/// When no reduction applies every index of `series` is returned.
pub fn downsample_indices(series: &[Sample], threshold: usize) -> Vec<usize> {
    if !reduces(series.len(), threshold) {
        return (0..series.len()).collect();
    }

    let mut indices = Vec::with_capacity(threshold);
    select(series, threshold, |i| indices.push(i));
    indices
}

fn reduces(n: usize, threshold: usize) -> bool {
    threshold > 2 && threshold < n
}

// Requires 2 < threshold < series.len().
fn select(series: &[Sample], threshold: usize, mut keep: impl FnMut(usize)) {
    let n = series.len();
    let buckets = threshold - 2;

    let boundary = |i: usize| bucket_start(i, n, buckets);

    keep(0);

    let mut a = 0usize;
    let mut start = boundary(0);
    let mut end = boundary(1);

    for i in 0..buckets {
        let next_end = boundary(i + 2);
        let (avg_x, avg_y) = centroid(&series[end..next_end]);

        let Sample { x: ax, y: ay } = series[a];
        let mut max_area = -1.0f64;
        let mut next_a = start;

        for (j, p) in series.iter().enumerate().take(end).skip(start) {
            let area = ((ax - avg_x) * (p.y - ay) - (ax - p.x) * (avg_y - ay)).abs();
            if area > max_area {
                max_area = area;
                next_a = j;
            }
        }

        keep(next_a);
        a = next_a;
        start = end;
        end = next_end;
    }

    keep(n - 1);
}

// Bucket i covers interior offsets [ceil(i * every), ceil((i + 1) * every))
// with every = (n - 2) / buckets, shifted by one past the first sample.
// bucket_start(buckets) == n - 1, so the last bucket ends right before the
// last sample, which serves as the final lookahead "bucket". Computed in
// u64 so i * (n - 2) cannot overflow a 32-bit usize.
fn bucket_start(i: usize, n: usize, buckets: usize) -> usize {
    let (i, n, buckets) = (i as u64, n as u64, buckets as u64);
    ((i * (n - 2) + buckets - 1) / buckets + 1).min(n) as usize
}

fn centroid(bucket: &[Sample]) -> (f64, f64) {
    let (sum_x, sum_y) = bucket
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let len = bucket.len() as f64;
    (sum_x / len, sum_y / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, f64)]) -> Vec<Sample> {
        points.iter().copied().map(Sample::from).collect()
    }

    fn wave(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                Sample::new(x, (x / 7.0).sin() * 100.0 + (x / 2.0).cos() * 5.0)
            })
            .collect()
    }

    #[test]
    fn threshold_ge_n_returns_original() {
        let data: Vec<Sample> = (0..5).map(|i| Sample::new(i as f64, i as f64)).collect();
        assert_eq!(downsample(&data, 5).as_ref(), data.as_slice());
        assert_eq!(downsample(&data, 10).as_ref(), data.as_slice());
    }

    #[test]
    fn threshold_lt_3_returns_original() {
        let data: Vec<Sample> = (0..5).map(|i| Sample::new(i as f64, i as f64)).collect();
        assert_eq!(downsample(&data, 2).as_ref(), data.as_slice());
        assert_eq!(downsample(&data, 1).as_ref(), data.as_slice());
        assert_eq!(downsample(&data, 0).as_ref(), data.as_slice());
    }

    #[test]
    fn identity_is_borrowed() {
        let data = wave(50);
        assert!(matches!(downsample(&data, 0), Cow::Borrowed(_)));
        assert!(matches!(downsample(&data, 50), Cow::Borrowed(_)));
        assert!(matches!(downsample(&data, 10), Cow::Owned(_)));
    }

    #[test]
    fn empty_series() {
        for t in [0, 1, 3, 1000] {
            assert!(downsample(&[], t).is_empty());
            assert!(downsample_indices(&[], t).is_empty());
        }
    }

    #[test]
    fn single_point() {
        let data = series(&[(1.0, 1.0)]);
        assert_eq!(downsample(&data, 5).as_ref(), data.as_slice());
    }

    #[test]
    fn two_points() {
        let data = series(&[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(downsample(&data, 5).as_ref(), data.as_slice());
    }

    #[test]
    fn three_points_to_five() {
        let data = series(&[(0.0, 0.0), (1.0, 3.0), (2.0, 2.0)]);
        assert_eq!(downsample(&data, 5).as_ref(), data.as_slice());
    }

    #[test]
    fn preserves_first_and_last() {
        let data = wave(10);
        let result = downsample(&data, 5);
        assert_eq!(result.first(), data.first());
        assert_eq!(result.last(), data.last());
    }

    #[test]
    fn length_endpoints_and_order_for_every_threshold() {
        let data = wave(257);
        for t in 3..data.len() {
            let indices = downsample_indices(&data, t);
            assert_eq!(indices.len(), t, "threshold {t}");
            assert_eq!(indices[0], 0);
            assert_eq!(indices[t - 1], data.len() - 1);
            assert!(indices.windows(2).all(|w| w[0] < w[1]), "threshold {t}");

            let result = downsample(&data, t);
            let picked: Vec<Sample> = indices.iter().map(|&i| data[i]).collect();
            assert_eq!(result.as_ref(), picked.as_slice());
        }
    }

    #[test]
    fn bucket_starts_for_large_series() {
        // i * (n - 2) exceeds u32::MAX here.
        let n = 200_000;
        let buckets = 199_000;
        assert_eq!(bucket_start(0, n, buckets), 1);
        assert_eq!(bucket_start(buckets, n, buckets), n - 1);
        assert_eq!(bucket_start(buckets + 1, n, buckets), n);
        assert!((0..=buckets)
            .all(|i| bucket_start(i, n, buckets) < bucket_start(i + 1, n, buckets)));

        let indices = downsample_indices(&wave(n), buckets + 2);
        assert_eq!(indices.len(), buckets + 2);
        assert_eq!(indices[buckets + 1], n - 1);
    }

    #[test]
    fn deterministic() {
        let data = wave(1000);
        assert_eq!(downsample(&data, 64), downsample(&data, 64));
    }

    #[test]
    fn known_downsampling() {
        let data = series(&[
            (0.0, 0.0),
            (1.0, 5.0),
            (2.0, 1.0),
            (3.0, 8.0),
            (4.0, 2.0),
            (5.0, 9.0),
            (6.0, 0.0),
        ]);
        // Buckets {1, 2, 3} and {4, 5}; areas against (4.5, 5.5) are
        // 17, 6.5, 19.5 and then against (6, 0) are 10, 19.
        let result = downsample(&data, 4);
        assert_eq!(
            result.as_ref(),
            series(&[(0.0, 0.0), (3.0, 8.0), (5.0, 9.0), (6.0, 0.0)]).as_slice()
        );
    }

    #[test]
    fn keeps_spike() {
        let mut data: Vec<Sample> = (0..100).map(|i| Sample::new(i as f64, 1.0)).collect();
        data[42].y = 500.0;
        let result = downsample(&data, 10);
        assert!(result.contains(&Sample::new(42.0, 500.0)));
    }

    #[test]
    fn collinear_ties_pick_first_in_bucket() {
        let data: Vec<Sample> = (0..10).map(|i| Sample::new(i as f64, i as f64)).collect();
        // Buckets {1, 2, 3}, {4, 5, 6}, {7, 8}.
        assert_eq!(downsample_indices(&data, 5), vec![0, 1, 4, 7, 9]);
    }

    #[test]
    fn non_monotonic_x_is_accepted() {
        let data = series(&[(0.0, 0.0), (2.0, 1.0), (1.0, 7.0), (1.0, 2.0), (3.0, 3.0)]);
        let result = downsample(&data, 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result[1], Sample::new(1.0, 7.0));
    }

    #[test]
    fn nan_propagates_without_panicking() {
        let mut data = wave(20);
        data[5].y = f64::NAN;
        data[6].x = f64::INFINITY;
        let indices = downsample_indices(&data, 6);
        assert_eq!(indices.len(), 6);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }
}
