//! Threaded nearest-centroid pass shared by Lloyd steps and postprocessing.

use std::cmp::Ordering;

use tabula_core::{Error, ErrorId, SafeStatus, Status};
use tabula_table::{HomogenNumericTable, NumericTable, ReadRows, WriteOnlyRows};
use tabula_threading::Tls;

use super::KMeans;

/// Centroids copied out of their table, row-major.
pub(super) struct Centroids {
    k: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl Centroids {
    pub(super) fn read(table: &dyn NumericTable) -> Result<Self, Status> {
        let mut rows = ReadRows::<f64>::new(table, 0, table.n_rows())?;
        let values = rows.get().to_vec();
        rows.release()?;
        Ok(Self {
            k: table.n_rows(),
            n_cols: table.n_cols(),
            values,
        })
    }

    pub(super) fn from_values(values: Vec<f64>, k: usize, n_cols: usize) -> Self {
        Self { k, n_cols, values }
    }

    pub(super) fn k(&self) -> usize {
        self.k
    }

    pub(super) fn row(&self, c: usize) -> &[f64] {
        &self.values[c * self.n_cols..(c + 1) * self.n_cols]
    }

    pub(super) fn row_mut(&mut self, c: usize) -> &mut [f64] {
        &mut self.values[c * self.n_cols..(c + 1) * self.n_cols]
    }

    /// Index and squared distance of the nearest centroid. Ties go to the
    /// lowest index.
    pub(super) fn nearest(&self, x: &[f64]) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for c in 0..self.k {
            let d = squared_distance(x, self.row(c));
            if d < best.1 {
                best = (c, d);
            }
        }
        best
    }

    pub(super) fn into_table(self) -> Result<HomogenNumericTable<f64>, Status> {
        Ok(HomogenNumericTable::from_vec(self.values, self.k, self.n_cols)?)
    }
}

pub(super) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// What a pass accumulates beyond the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Track {
    /// Objective only.
    Objective,
    /// Per-cluster sums and counts, plus the rows farthest from their
    /// centroid for re-seeding empty clusters.
    Clusters,
}

/// One worker's partial results.
pub(super) struct Partial {
    pub(super) sums: Vec<f64>,
    pub(super) counts: Vec<usize>,
    pub(super) objective: f64,
    pub(super) farthest: Farthest,
}

impl Partial {
    fn new(k: usize, n_cols: usize, track: Track) -> Self {
        match track {
            Track::Objective => Self {
                sums: Vec::new(),
                counts: Vec::new(),
                objective: 0.0,
                farthest: Farthest::new(0),
            },
            Track::Clusters => Self {
                sums: vec![0.0; k * n_cols],
                counts: vec![0; k],
                objective: 0.0,
                farthest: Farthest::new(k),
            },
        }
    }

    fn add_row(&mut self, row: usize, x: &[f64], cluster: usize, distance: f64) {
        self.objective += distance;
        if self.counts.is_empty() {
            return;
        }
        self.counts[cluster] += 1;
        let n_cols = x.len();
        for (s, v) in self.sums[cluster * n_cols..(cluster + 1) * n_cols]
            .iter_mut()
            .zip(x)
        {
            *s += v;
        }
        self.farthest.offer(distance, row);
    }

    fn merge(mut self, other: Partial) -> Self {
        self.objective += other.objective;
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            *a += b;
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        for (d, row) in other.farthest.items {
            self.farthest.offer(d, row);
        }
        self
    }
}

/// The `cap` rows with the largest distance, largest first, ties broken
/// by lower row index.
pub(super) struct Farthest {
    cap: usize,
    items: Vec<(f64, usize)>,
}

impl Farthest {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            items: Vec::with_capacity(cap),
        }
    }

    fn offer(&mut self, distance: f64, row: usize) {
        if self.cap == 0 {
            return;
        }
        let pos = self
            .items
            .partition_point(|&(d, r)| Self::order(d, r, distance, row) == Ordering::Less);
        if pos < self.cap {
            self.items.insert(pos, (distance, row));
            self.items.truncate(self.cap);
        }
    }

    fn order(d: f64, r: usize, distance: f64, row: usize) -> Ordering {
        distance.total_cmp(&d).then(r.cmp(&row))
    }

    /// Rows in re-seeding order.
    pub(super) fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().map(|&(_, r)| r)
    }
}

/// Assign every row of `data` to its nearest centroid.
///
/// When `assignments` is given, each block writes its labels into its own
/// row range of that `n_rows x 1` table through a write-only block.
pub(super) fn assign_pass(
    model: &KMeans<'_>,
    data: &dyn NumericTable,
    centroids: &Centroids,
    track: Track,
    assignments: Option<&dyn NumericTable>,
) -> Result<Partial, Status> {
    let n_cols = data.n_cols();
    let k = centroids.k();
    let block = model.block_rows(data);
    let status = SafeStatus::new();
    let tls = Tls::new(|| Partial::new(k, n_cols, track));
    model
        .threader()
        .threader_reduce(data.n_rows(), block, &tls, |partial, rows| {
            if !status.is_ok() {
                return;
            }
            status.record(assign_block(
                data,
                rows.start,
                rows.len(),
                centroids,
                partial,
                assignments,
            ));
        })?;
    status.into_result()?;
    Ok(tls.reduce(Partial::new(k, n_cols, track), Partial::merge))
}

fn assign_block(
    data: &dyn NumericTable,
    start: usize,
    n: usize,
    centroids: &Centroids,
    partial: &mut Partial,
    assignments: Option<&dyn NumericTable>,
) -> Result<(), Status> {
    let mut rows = ReadRows::<f64>::new(data, start, n)?;
    let mut labels = match assignments {
        Some(table) => Some(WriteOnlyRows::<i32>::new(table, start, n)?),
        None => None,
    };
    for i in 0..rows.n_rows() {
        let x = rows.row(i);
        let (cluster, distance) = centroids.nearest(x);
        partial.add_row(start + i, x, cluster, distance);
        if let Some(labels) = labels.as_mut() {
            labels.get_mut()[i] = label(cluster)?;
        }
    }
    if let Some(mut labels) = labels {
        labels.release()?;
    }
    rows.release()
}

fn label(cluster: usize) -> Result<i32, Error> {
    i32::try_from(cluster).map_err(|_| {
        Error::new(ErrorId::IncorrectNumberOfClusters)
            .with_message(format!("cluster index {cluster} does not fit an i32 label"))
    })
}
