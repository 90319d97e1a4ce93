//! K-means clustering on numeric tables.
//!
//! The building blocks are exposed separately so callers can drive the
//! iteration themselves:
//!
//! - [`init`] picks starting centroids.
//! - [`lloyd_step`] assigns every row to its nearest centroid and
//!   recomputes the centroids from the assignment.
//! - [`postprocess`] writes the final per-row assignment table.
//! - [`fit`] runs all three until convergence.
//!
//! Every pass splits the rows of `data` into blocks, processes blocks on
//! the [`Threader`] with per-worker partial sums, and reduces the partials
//! after the join. Any layout is accepted; rows are read as `f64`.
//!
//! ```
//! use tabula_core::Status;
//! use tabula_kernels::kmeans::{self, InitMethod, KMeansParams};
//! use tabula_table::{HomogenNumericTable, NumericTable};
//!
//! # fn main() -> Result<(), Status> {
//! let data = HomogenNumericTable::from_vec(
//!     vec![0.0, 0.0, 0.1, 0.1, 9.0, 9.0, 9.1, 9.1],
//!     4,
//!     2,
//! )?;
//! let params = KMeansParams {
//!     init: InitMethod::PlusPlus,
//!     ..KMeansParams::new(2)
//! };
//! let result = kmeans::fit(&data, &params)?;
//! assert_eq!(result.centroids.n_rows(), 2);
//! assert!(result.objective < 0.1);
//! # Ok(())
//! # }
//! ```

mod assign;
mod init;
mod lloyd;
mod postprocess;

use tabula_core::{Error, ErrorId, MemoryStatus, Status};
use tabula_table::{check_numeric_table, CheckOptions, HomogenNumericTable, NumericTable};
use tabula_threading::Threader;

use crate::finiteness::all_values_are_finite_with;

pub use lloyd::LloydStep;
pub use postprocess::Postprocessed;

/// How [`init`] chooses the starting centroids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitMethod {
    /// The first `k` rows.
    #[default]
    Deterministic,
    /// `k` distinct rows drawn uniformly.
    Random,
    /// k-means++: each next centroid is drawn with probability
    /// proportional to its squared distance from the chosen ones.
    PlusPlus,
}

/// Parameters of a k-means run.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansParams {
    /// Number of clusters.
    pub k: usize,
    /// Upper bound on Lloyd steps. Zero runs initialization only.
    pub max_iterations: usize,
    /// Stop once the relative objective decrease falls below this.
    pub accuracy_threshold: f64,
    /// Centroid initialization.
    pub init: InitMethod,
    /// Seed for [`InitMethod::Random`] and [`InitMethod::PlusPlus`].
    pub seed: u64,
    /// Rows per block. `None` = cache-size heuristic.
    pub block_rows: Option<usize>,
}

impl KMeansParams {
    /// Defaults for `k` clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 100,
            accuracy_threshold: 1e-6,
            init: InitMethod::Deterministic,
            seed: 777,
            block_rows: None,
        }
    }

    /// Check the data-independent invariants.
    pub fn validate(&self) -> Result<(), Status> {
        let mut status = Status::ok();
        if self.k == 0 {
            status.add(
                Error::new(ErrorId::IncorrectNumberOfClusters)
                    .with_argument("k")
                    .with_message("at least one cluster required"),
            );
        }
        if !self.accuracy_threshold.is_finite() || self.accuracy_threshold < 0.0 {
            status.add(
                Error::new(ErrorId::IncorrectParameter)
                    .with_argument("accuracy_threshold")
                    .with_message(format!(
                        "must be finite and non-negative, got {}",
                        self.accuracy_threshold
                    )),
            );
        }
        if self.block_rows == Some(0) {
            status.add(
                Error::new(ErrorId::IncorrectParameter)
                    .with_argument("block_rows")
                    .with_message("block size must be at least 1"),
            );
        }
        status.into_result()
    }
}

/// Output of [`fit`].
#[derive(Debug)]
pub struct KMeansResult {
    /// `k x n_cols` final centroids.
    pub centroids: HomogenNumericTable<f64>,
    /// `n_rows x 1` index of each row's nearest final centroid.
    pub assignments: HomogenNumericTable<i32>,
    /// Sum of squared distances to the nearest final centroid.
    pub objective: f64,
    /// Lloyd steps performed.
    pub iterations: usize,
}

/// A k-means configuration bound to a threader.
#[derive(Clone, Debug)]
pub struct KMeans<'t> {
    params: KMeansParams,
    threader: &'t Threader,
}

impl KMeans<'static> {
    /// Validate `params` and run on the global threader.
    pub fn new(params: KMeansParams) -> Result<Self, Status> {
        Self::with_threader(params, Threader::global())
    }
}

impl<'t> KMeans<'t> {
    /// Validate `params` and run on `threader`.
    pub fn with_threader(params: KMeansParams, threader: &'t Threader) -> Result<Self, Status> {
        params.validate()?;
        Ok(Self { params, threader })
    }

    /// The validated parameters.
    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    /// Starting centroids for `data`.
    pub fn init(&self, data: &dyn NumericTable) -> Result<HomogenNumericTable<f64>, Status> {
        self.check_data(data)?;
        init::init(self, data)
    }

    /// One Lloyd step from `centroids`, optionally recording assignments.
    pub fn lloyd_step(
        &self,
        data: &dyn NumericTable,
        centroids: &dyn NumericTable,
        with_assignments: bool,
    ) -> Result<LloydStep, Status> {
        self.check_data(data)?;
        self.check_centroids(data, centroids)?;
        lloyd::lloyd_step(self, data, centroids, with_assignments)
    }

    /// Assignment table and objective for `centroids`.
    pub fn postprocess(
        &self,
        data: &dyn NumericTable,
        centroids: &dyn NumericTable,
    ) -> Result<Postprocessed, Status> {
        self.check_data(data)?;
        self.check_centroids(data, centroids)?;
        postprocess::postprocess(self, data, centroids)
    }

    /// Initialize, iterate to convergence and postprocess.
    pub fn fit(&self, data: &dyn NumericTable) -> Result<KMeansResult, Status> {
        self.check_data(data)?;
        let mut centroids = init::init(self, data)?;
        let mut previous = f64::INFINITY;
        let mut iterations = 0;
        while iterations < self.params.max_iterations {
            let step = lloyd::lloyd_step(self, data, &centroids, false)?;
            centroids = step.centroids;
            iterations += 1;
            let decrease = previous - step.objective;
            tracing::debug!(iteration = iterations, objective = step.objective, "lloyd step");
            if previous.is_finite()
                && decrease <= self.params.accuracy_threshold * previous.abs()
            {
                break;
            }
            previous = step.objective;
        }
        let done = postprocess::postprocess(self, data, &centroids)?;
        Ok(KMeansResult {
            centroids,
            assignments: done.assignments,
            objective: done.objective,
            iterations,
        })
    }

    pub(crate) fn k(&self) -> usize {
        self.params.k
    }

    pub(crate) fn threader(&self) -> &'t Threader {
        self.threader
    }

    pub(crate) fn block_rows(&self, data: &dyn NumericTable) -> usize {
        self.threader
            .block_rows(data.n_rows(), data.n_cols(), 8, self.params.block_rows)
    }

    fn check_data(&self, data: &dyn NumericTable) -> Result<(), Status> {
        if data.memory_status() != MemoryStatus::NotAllocated && data.n_rows() == 0 {
            return Err(Error::new(ErrorId::EmptyInput).with_argument("data").into());
        }
        check_numeric_table(data, &CheckOptions::new("data"))?;
        if self.params.k > data.n_rows() {
            return Err(Error::new(ErrorId::IncorrectNumberOfClusters)
                .with_argument("k")
                .with_sizes(data.n_rows(), self.params.k)
                .with_message("more clusters than rows")
                .into());
        }
        if !all_values_are_finite_with(self.threader, data, false)? {
            return Err(Error::new(ErrorId::InputContainsNonFinite)
                .with_argument("data")
                .into());
        }
        Ok(())
    }

    fn check_centroids(
        &self,
        data: &dyn NumericTable,
        centroids: &dyn NumericTable,
    ) -> Result<(), Status> {
        let opts = CheckOptions::new("centroids")
            .n_cols(data.n_cols())
            .n_rows(self.params.k);
        check_numeric_table(centroids, &opts)?;
        if !all_values_are_finite_with(self.threader, centroids, false)? {
            return Err(Error::new(ErrorId::InputContainsNonFinite)
                .with_argument("centroids")
                .into());
        }
        Ok(())
    }
}

/// Starting centroids on the global threader.
pub fn init(
    data: &dyn NumericTable,
    k: usize,
    method: InitMethod,
    seed: u64,
) -> Result<HomogenNumericTable<f64>, Status> {
    let params = KMeansParams {
        init: method,
        seed,
        ..KMeansParams::new(k)
    };
    KMeans::new(params)?.init(data)
}

/// One Lloyd step on the global threader; `k` is the centroid row count.
pub fn lloyd_step(
    data: &dyn NumericTable,
    centroids: &dyn NumericTable,
) -> Result<LloydStep, Status> {
    KMeans::new(KMeansParams::new(centroids.n_rows()))?.lloyd_step(data, centroids, false)
}

/// Assignments and objective on the global threader.
pub fn postprocess(
    data: &dyn NumericTable,
    centroids: &dyn NumericTable,
) -> Result<Postprocessed, Status> {
    KMeans::new(KMeansParams::new(centroids.n_rows()))?.postprocess(data, centroids)
}

/// Full k-means run on the global threader.
pub fn fit(data: &dyn NumericTable, params: &KMeansParams) -> Result<KMeansResult, Status> {
    KMeans::new(params.clone())?.fit(data)
}
