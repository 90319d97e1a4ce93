use tabula_core::Status;
use tabula_table::{HomogenNumericTable, NumericTable};

use super::assign::{assign_pass, Centroids, Track};
use super::KMeans;

/// Final assignment of rows to centroids.
#[derive(Debug)]
pub struct Postprocessed {
    /// `n_rows x 1` index of each row's nearest centroid.
    pub assignments: HomogenNumericTable<i32>,
    /// Sum of squared distances to the nearest centroid.
    pub objective: f64,
}

pub(super) fn postprocess(
    model: &KMeans<'_>,
    data: &dyn NumericTable,
    centroids: &dyn NumericTable,
) -> Result<Postprocessed, Status> {
    let centroids = Centroids::read(centroids)?;
    let assignments = HomogenNumericTable::<i32>::zeroed(data.n_rows(), 1)?;
    let partial = assign_pass(
        model,
        data,
        &centroids,
        Track::Objective,
        Some(&assignments),
    )?;
    Ok(Postprocessed {
        assignments,
        objective: partial.objective,
    })
}
