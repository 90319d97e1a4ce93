//! Centroid initialization.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tabula_core::{SafeStatus, Status};
use tabula_table::{HomogenNumericTable, NumericTable, ReadRows, WriteRows};
use tabula_threading::Tls;

use super::assign::squared_distance;
use super::{InitMethod, KMeans};

pub(super) fn init(
    model: &KMeans<'_>,
    data: &dyn NumericTable,
) -> Result<HomogenNumericTable<f64>, Status> {
    let k = model.k();
    let params = model.params();
    tracing::debug!(k, method = ?params.init, "kmeans init");
    let rows = match params.init {
        InitMethod::Deterministic => (0..k).collect(),
        InitMethod::Random => {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
            rand::seq::index::sample(&mut rng, data.n_rows(), k).into_vec()
        }
        InitMethod::PlusPlus => plus_plus(model, data)?,
    };
    gather_rows(data, &rows)
}

fn gather_rows(data: &dyn NumericTable, rows: &[usize]) -> Result<HomogenNumericTable<f64>, Status> {
    let mut values = Vec::with_capacity(rows.len() * data.n_cols());
    for &row in rows {
        let mut point = ReadRows::<f64>::new(data, row, 1)?;
        values.extend_from_slice(point.get());
        point.release()?;
    }
    Ok(HomogenNumericTable::from_vec(values, rows.len(), data.n_cols())?)
}

/// k-means++ seeding. Minimum squared distances to the chosen centroids
/// live in an `n_rows x 1` table that workers update in place, each
/// through a read-write block over its own rows.
fn plus_plus(model: &KMeans<'_>, data: &dyn NumericTable) -> Result<Vec<usize>, Status> {
    let n_rows = data.n_rows();
    let k = model.k();
    let mut rng = ChaCha8Rng::seed_from_u64(model.params().seed);
    let mut chosen = Vec::with_capacity(k);
    chosen.push(rng.random_range(0..n_rows));

    let distances = HomogenNumericTable::<f64>::from_vec(vec![f64::INFINITY; n_rows], n_rows, 1)?;
    let block = model.block_rows(data);
    while chosen.len() < k {
        let mut last = ReadRows::<f64>::new(data, chosen[chosen.len() - 1], 1)?;
        let center = last.get().to_vec();
        last.release()?;

        let status = SafeStatus::new();
        let tls = Tls::new(|| 0.0f64);
        model
            .threader()
            .threader_reduce(n_rows, block, &tls, |total, rows| {
                if status.is_ok() {
                    if let Some(sum) = status.record(tighten(data, &distances, rows.start, rows.len(), &center)) {
                        *total += sum;
                    }
                }
            })?;
        status.into_result()?;
        let total = tls.reduce(0.0, |a, b| a + b);
        chosen.push(pick(&distances, total, &mut rng)?);
    }
    Ok(chosen)
}

/// Lower each row's distance to `center` if closer; returns the block's
/// new distance sum.
fn tighten(
    data: &dyn NumericTable,
    distances: &dyn NumericTable,
    start: usize,
    n: usize,
    center: &[f64],
) -> Result<f64, Status> {
    let mut rows = ReadRows::<f64>::new(data, start, n)?;
    let mut dist = WriteRows::<f64>::new(distances, start, n)?;
    let mut sum = 0.0;
    for (i, d) in dist.get_mut().iter_mut().enumerate() {
        *d = d.min(squared_distance(rows.row(i), center));
        sum += *d;
    }
    dist.release()?;
    rows.release()?;
    Ok(sum)
}

/// Draw a row with probability proportional to its distance.
fn pick(distances: &dyn NumericTable, total: f64, rng: &mut ChaCha8Rng) -> Result<usize, Status> {
    let n_rows = distances.n_rows();
    let mut all = ReadRows::<f64>::new(distances, 0, n_rows)?;
    let d = all.get();
    let row = if total > 0.0 && total.is_finite() {
        let mut target = rng.random::<f64>() * total;
        d.iter()
            .position(|&v| {
                target -= v;
                target < 0.0 && v > 0.0
            })
            // Rounding can leave a sliver past the last row.
            .or_else(|| d.iter().rposition(|&v| v > 0.0))
            .unwrap_or(0)
    } else {
        // Every row coincides with a chosen centroid.
        rng.random_range(0..n_rows)
    };
    all.release()?;
    Ok(row)
}
