//! K-means over generated blobs: postprocessing agrees with a sequential
//! recomputation, every layout clusters the same way, and invalid input
//! is rejected with the matching error id.

use tabula_core::{ErrorId, NumericValue, ReadWriteMode};
use tabula_kernels::kmeans::{self, InitMethod, KMeans, KMeansParams};
use tabula_kernels::norms;
use tabula_table::{HomogenNumericTable, NumericTable, NumericTableExt};
use tabula_test_utils::fixtures::FailingTable;
use tabula_test_utils::{blobs, build_table, random_matrix, TableLayout};
use tabula_threading::{Threader, ThreadingConfig};
use tracing_subscriber::EnvFilter;

const N_COLS: usize = 3;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn centers() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 0.0, 0.0],
        vec![20.0, 0.0, -5.0],
        vec![0.0, 20.0, 5.0],
        vec![-20.0, -20.0, 0.0],
    ]
}

fn read_all<T: NumericValue>(t: &dyn NumericTable) -> Vec<T> {
    t.rows::<T>(0..t.n_rows(), ReadWriteMode::Read)
        .unwrap()
        .as_slice()
        .to_vec()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn threader() -> Threader {
    Threader::new(&ThreadingConfig::with_threads(4)).unwrap()
}

#[test]
fn postprocess_matches_sequential_recomputation() {
    init_tracing();
    let (data, _) = blobs(3, &centers(), 250, 2.0);
    let n_rows = data.len() / N_COLS;
    let centroids = HomogenNumericTable::from_vec(random_matrix(4, 4, N_COLS), 4, N_COLS).unwrap();
    let threader = threader();
    let params = KMeansParams {
        block_rows: Some(37),
        ..KMeansParams::new(4)
    };
    let model = KMeans::with_threader(params, &threader).unwrap();
    let c = read_all::<f64>(&centroids);

    for layout in TableLayout::ALL {
        let table = build_table::<f64>(layout, &data, n_rows, N_COLS);
        let done = model.postprocess(table.as_ref(), &centroids).unwrap();
        let labels = done.assignments.to_vec().unwrap();
        assert_eq!(labels.len(), n_rows);

        let mut objective = 0.0;
        for (i, &label) in labels.iter().enumerate() {
            let x = &data[i * N_COLS..(i + 1) * N_COLS];
            let distances: Vec<f64> = c.chunks(N_COLS).map(|m| squared_distance(x, m)).collect();
            let best = distances.iter().copied().fold(f64::INFINITY, f64::min);
            assert_eq!(distances[label as usize], best, "{layout:?} row {i}");
            objective += best;
        }
        let rel = (done.objective - objective).abs() / objective;
        assert!(rel < 1e-12, "{layout:?}: {} vs {objective}", done.objective);
    }
}

#[test]
fn fit_recovers_generating_clusters() {
    init_tracing();
    let (data, truth) = blobs(8, &centers(), 120, 1.0);
    let n_rows = truth.len();
    let threader = threader();
    for layout in TableLayout::ALL {
        let table = build_table::<f64>(layout, &data, n_rows, N_COLS);
        let params = KMeansParams {
            init: InitMethod::PlusPlus,
            seed: 21,
            ..KMeansParams::new(4)
        };
        let result = KMeans::with_threader(params, &threader)
            .unwrap()
            .fit(table.as_ref())
            .unwrap();
        assert!(result.iterations >= 1);
        let labels = result.assignments.to_vec().unwrap();
        // Same partition as the generating centers, up to relabeling.
        for i in 0..n_rows {
            for j in 0..n_rows {
                assert_eq!(truth[i] == truth[j], labels[i] == labels[j], "{layout:?} rows {i} {j}");
            }
        }
        // Jitter is at most 1 per coordinate.
        assert!(result.objective <= (n_rows * N_COLS) as f64, "{layout:?}");
    }
}

#[test]
fn lloyd_objective_never_increases() {
    let (data, _) = blobs(13, &centers(), 100, 6.0);
    let table = build_table::<f32>(TableLayout::Soa, &data, 400, N_COLS);
    let threader = threader();
    let model = KMeans::with_threader(
        KMeansParams {
            init: InitMethod::Random,
            block_rows: Some(16),
            ..KMeansParams::new(4)
        },
        &threader,
    )
    .unwrap();
    let mut centroids = model.init(table.as_ref()).unwrap();
    let mut previous = f64::INFINITY;
    for _ in 0..10 {
        let step = model.lloyd_step(table.as_ref(), &centroids, false).unwrap();
        assert!(step.objective <= previous * (1.0 + 1e-12));
        previous = step.objective;
        centroids = step.centroids;
    }
}

#[test]
fn free_functions_use_the_global_threader() {
    let (data, _) = blobs(2, &centers(), 10, 0.5);
    let table = HomogenNumericTable::from_vec(data, 40, N_COLS).unwrap();
    let centroids = kmeans::init(&table, 4, InitMethod::Deterministic, 0).unwrap();
    let step = kmeans::lloyd_step(&table, &centroids).unwrap();
    let done = kmeans::postprocess(&table, &step.centroids).unwrap();
    assert!(done.objective <= step.objective);
    let norms = norms::row_squared_l2_norms(&step.centroids).unwrap();
    assert_eq!(norms.n_rows(), 4);
}

#[test]
fn invalid_inputs_are_rejected() {
    let table = HomogenNumericTable::from_vec(random_matrix(1, 5, 2), 5, 2).unwrap();

    let err = kmeans::fit(&table, &KMeansParams::new(6)).unwrap_err();
    assert!(err.contains(ErrorId::IncorrectNumberOfClusters));

    let err = kmeans::fit(&table, &KMeansParams::new(0)).unwrap_err();
    assert!(err.contains(ErrorId::IncorrectNumberOfClusters));

    let wrong_cols = HomogenNumericTable::<f64>::zeroed(2, 3).unwrap();
    let err = kmeans::postprocess(&table, &wrong_cols).unwrap_err();
    assert!(err.contains(ErrorId::IncorrectNumberOfColumns));

    let empty = HomogenNumericTable::<f64>::zeroed(0, 2).unwrap();
    let err = kmeans::fit(&empty, &KMeansParams::new(1)).unwrap_err();
    assert!(err.contains(ErrorId::EmptyInput));

    let mut values = random_matrix(1, 5, 2);
    values[3] = f64::NAN;
    let bad = HomogenNumericTable::from_vec(values, 5, 2).unwrap();
    let err = kmeans::fit(&bad, &KMeansParams::new(2)).unwrap_err();
    assert!(err.contains(ErrorId::InputContainsNonFinite));
}

#[test]
fn block_failures_surface_after_the_join() {
    let inner = build_table::<f64>(TableLayout::RowMajor, &random_matrix(6, 400, 2), 400, 2);
    // The finiteness check takes one block; Lloyd blocks then fail.
    let failing = FailingTable::new(inner, 1, ErrorId::MemoryAllocationFailed);
    let centroids = HomogenNumericTable::<f64>::zeroed(3, 2).unwrap();
    let threader = threader();
    let model = KMeans::with_threader(
        KMeansParams {
            block_rows: Some(10),
            ..KMeansParams::new(3)
        },
        &threader,
    )
    .unwrap();
    let err = model.lloyd_step(&failing, &centroids, true).unwrap_err();
    assert!(err.contains(ErrorId::MemoryAllocationFailed));
    assert!(err.errors().iter().all(|e| e.id() == ErrorId::MemoryAllocationFailed));
}
