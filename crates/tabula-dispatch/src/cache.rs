//! Cache-size estimates and the row block-size heuristic.

use std::path::Path;
use std::sync::OnceLock;

/// Smallest row block handed to a worker.
pub const MIN_BLOCK_ROWS: usize = 32;
/// Largest row block handed to a worker.
pub const MAX_BLOCK_ROWS: usize = 8192;

/// Data cache sizes in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheInfo {
    /// L1 data cache per core.
    pub l1d: usize,
    /// L2 cache per core.
    pub l2: usize,
    /// Last-level cache.
    pub l3: usize,
}

impl Default for CacheInfo {
    fn default() -> Self {
        Self {
            l1d: 32 * 1024,
            l2: 256 * 1024,
            l3: 8 * 1024 * 1024,
        }
    }
}

static CACHE: OnceLock<CacheInfo> = OnceLock::new();

impl CacheInfo {
    /// Cache sizes of the running machine, read once.
    ///
    /// Uses Linux sysfs where available; any level it cannot read keeps
    /// its default.
    pub fn detect() -> &'static CacheInfo {
        CACHE.get_or_init(|| {
            let info = Self::from_sysfs(Path::new("/sys/devices/system/cpu/cpu0/cache"));
            tracing::debug!(?info, "cache sizes");
            info
        })
    }

    /// Read `index*/{level,type,size}` entries below `dir`.
    pub fn from_sysfs(dir: &Path) -> Self {
        let mut info = Self::default();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return info;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let read = |name: &str| std::fs::read_to_string(path.join(name)).ok();
            let (Some(level), Some(kind), Some(size)) = (read("level"), read("type"), read("size"))
            else {
                continue;
            };
            let Some(bytes) = parse_size(&size) else {
                continue;
            };
            match (level.trim(), kind.trim()) {
                ("1", "Data" | "Unified") => info.l1d = bytes,
                ("2", _) => info.l2 = bytes,
                ("3", _) => info.l3 = bytes,
                _ => {}
            }
        }
        info
    }

    /// Rows per block such that a block of `n_cols` values of
    /// `elem_bytes` each fills about half of L2, clamped to
    /// `[MIN_BLOCK_ROWS, MAX_BLOCK_ROWS]`.
    pub fn block_size_for_rows(&self, n_cols: usize, elem_bytes: usize) -> usize {
        let row_bytes = n_cols.max(1).saturating_mul(elem_bytes.max(1));
        (self.l2 / 2 / row_bytes).clamp(MIN_BLOCK_ROWS, MAX_BLOCK_ROWS)
    }
}

/// Parse sysfs sizes such as `"48K"`, `"2048K"`, `"32M"` or `"512"`.
fn parse_size(raw: &str) -> Option<usize> {
    let s = raw.trim();
    let (digits, scale) = match s.as_bytes().last()? {
        b'K' | b'k' => (&s[..s.len() - 1], 1024),
        b'M' | b'm' => (&s[..s.len() - 1], 1024 * 1024),
        b'G' | b'g' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };
    digits.parse::<usize>().ok()?.checked_mul(scale)
}
