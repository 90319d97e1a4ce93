use tabula_core::Status;
use tabula_table::{HomogenNumericTable, NumericTable, ReadRows};

use super::assign::{assign_pass, Centroids, Track};
use super::KMeans;

/// Output of one Lloyd step.
#[derive(Debug)]
pub struct LloydStep {
    /// Recomputed `k x n_cols` centroids.
    pub centroids: HomogenNumericTable<f64>,
    /// Sum of squared distances to the nearest input centroid.
    pub objective: f64,
    /// `n_rows x 1` nearest input centroid per row, when requested.
    pub assignments: Option<HomogenNumericTable<i32>>,
    /// Clusters that received no rows and were re-seeded.
    pub empty_clusters: usize,
}

pub(super) fn lloyd_step(
    model: &KMeans<'_>,
    data: &dyn NumericTable,
    centroids: &dyn NumericTable,
    with_assignments: bool,
) -> Result<LloydStep, Status> {
    let input = Centroids::read(centroids)?;
    let assignments = if with_assignments {
        Some(HomogenNumericTable::<i32>::zeroed(data.n_rows(), 1)?)
    } else {
        None
    };
    let partial = assign_pass(
        model,
        data,
        &input,
        Track::Clusters,
        assignments.as_ref().map(|t| t as &dyn NumericTable),
    )?;

    let n_cols = data.n_cols();
    let k = model.k();
    let mut next = Centroids::from_values(partial.sums, k, n_cols);
    let mut reseed = partial.farthest.rows();
    let mut empty_clusters = 0;
    for c in 0..k {
        let count = partial.counts[c];
        if count > 0 {
            let count = count as f64;
            next.row_mut(c).iter_mut().for_each(|v| *v /= count);
            continue;
        }
        empty_clusters += 1;
        match reseed.next() {
            Some(row) => {
                let mut point = ReadRows::<f64>::new(data, row, 1)?;
                next.row_mut(c).copy_from_slice(point.get());
                point.release()?;
            }
            // Fewer distinct rows than empty clusters: keep the old centroid.
            None => next.row_mut(c).copy_from_slice(input.row(c)),
        }
    }
    if empty_clusters > 0 {
        tracing::debug!(empty_clusters, "re-seeded empty clusters");
    }
    Ok(LloydStep {
        centroids: next.into_table()?,
        objective: partial.objective,
        assignments,
        empty_clusters,
    })
}
