//! N-tuple value network.
//!
//! The value of a board is the sum of 32 table lookups: 4 six-cell patterns
//! read from each of the 8 symmetric images of the board. Every
//! (orientation, pattern) pair owns its own table, so table `4 * k + p` is
//! always addressed with pattern `p` read from image `k`.
//!
//! Persisted layout (little-endian):
//! - `count: u32`
//! - `count` tables of `16^6` `f32` weights each, in table order

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::Board;

/// Cells per pattern.
pub const TUPLE_LEN: usize = 6;

/// Weights per table: one per 24-bit key.
pub const TABLE_LEN: usize = 1 << (4 * TUPLE_LEN);

/// Symmetric images per board.
pub const ORIENTATIONS: usize = 8;

/// Row-major cell indices of the four patterns, most significant cell first.
pub const PATTERNS: [[usize; TUPLE_LEN]; 4] = [
    [0, 1, 2, 3, 4, 5],
    [8, 9, 10, 11, 12, 13],
    [5, 6, 7, 9, 10, 11],
    [9, 10, 11, 13, 14, 15],
];

/// Tables in a freshly allocated network.
pub const TABLE_COUNT: usize = ORIENTATIONS * PATTERNS.len();

#[derive(thiserror::Error, Debug)]
pub enum WeightError {
    #[error("cannot open weight file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("weight file truncated in table {table}")]
    Truncated { table: usize },
    #[error("weight file holds {0} tables, more than a u32 count allows")]
    TooManyTables(usize),
}

/// The 8 images of `board`: 4 clockwise rotations, then the horizontal
/// reflection and its 4 rotations.
pub fn isomorphisms(board: &Board) -> [Board; ORIENTATIONS] {
    let mut images = [*board; ORIENTATIONS];
    let mut b = *board;
    for image in images.iter_mut().take(4) {
        *image = b;
        b.rotate_right();
    }
    b.reflect_horizontal();
    for image in images.iter_mut().skip(4) {
        *image = b;
        b.rotate_right();
    }
    images
}

/// The image with the numerically largest raw grid; the first one wins ties.
///
/// ```
/// use threes_td::engine::Board;
/// use threes_td::network::{canonicalize, isomorphisms};
/// let b = Board::from_raw(0x0000_0000_0000_0321);
/// let c = canonicalize(&b);
/// assert!(isomorphisms(&b).iter().all(|s| canonicalize(s) == c));
/// ```
pub fn canonicalize(board: &Board) -> Board {
    let images = isomorphisms(board);
    let mut best = images[0];
    for image in &images[1..] {
        if image.raw() > best.raw() {
            best = *image;
        }
    }
    best
}

#[inline]
fn tuple_key(board: &Board, pattern: &[usize; TUPLE_LEN]) -> usize {
    pattern.iter().fold(0, |key, &cell| (key << 4) | board.cell(cell) as usize)
}

/// Table keys of `board`, in table order.
pub fn feature_keys(board: &Board) -> [usize; TABLE_COUNT] {
    let mut keys = [0usize; TABLE_COUNT];
    for (k, image) in isomorphisms(board).iter().enumerate() {
        for (p, pattern) in PATTERNS.iter().enumerate() {
            keys[k * PATTERNS.len() + p] = tuple_key(image, pattern);
        }
    }
    keys
}

fn zeroed_table() -> Box<[f32]> { vec![0.0f32; TABLE_LEN].into_boxed_slice() }

/// Weight tables of the value function.
pub struct NTupleNetwork {
    tables: Vec<Box<[f32]>>,
}

impl NTupleNetwork {
    /// A network of [`TABLE_COUNT`] zero-filled tables.
    pub fn new() -> Self { Self::zeroed(TABLE_COUNT) }

    /// A network of `count` zero-filled tables.
    ///
    /// Lookups only visit tables that exist, so a short network evaluates
    /// the leading (orientation, pattern) pairs and ignores the rest.
    pub fn zeroed(count: usize) -> Self {
        Self { tables: (0..count).map(|_| zeroed_table()).collect() }
    }

    #[inline]
    pub fn table_count(&self) -> usize { self.tables.len() }

    /// Weights of table `idx`.
    pub fn table(&self, idx: usize) -> Option<&[f32]> { self.tables.get(idx).map(|t| &t[..]) }

    /// Sum of the addressed weights over all images of `board`.
    pub fn evaluate(&self, board: &Board) -> f32 {
        self.tables
            .iter()
            .zip(feature_keys(board))
            .map(|(table, key)| table[key])
            .sum()
    }

    /// Add `delta` to every weight [`evaluate`](Self::evaluate) reads for `board`.
    pub fn increment(&mut self, board: &Board, delta: f32) {
        for (table, key) in self.tables.iter_mut().zip(feature_keys(board)) {
            table[key] += delta;
        }
    }

    /// Value of the canonical image of `board`; identical across its orbit.
    #[inline]
    pub fn value(&self, board: &Board) -> f32 { self.evaluate(&canonicalize(board)) }

    /// Write the count-prefixed table layout.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), WeightError> {
        let count = u32::try_from(self.tables.len())
            .map_err(|_| WeightError::TooManyTables(self.tables.len()))?;
        w.write_all(&count.to_le_bytes())?;
        for table in &self.tables {
            if cfg!(target_endian = "little") {
                w.write_all(bytemuck::cast_slice(&table[..]))?;
            } else {
                for weight in table.iter() {
                    w.write_all(&weight.to_le_bytes())?;
                }
            }
        }
        w.flush()?;
        Ok(())
    }

    /// Read the count-prefixed table layout, sized by the stored count.
    pub fn read_from<R: Read>(mut r: R) -> Result<Self, WeightError> {
        let mut count = [0u8; 4];
        r.read_exact(&mut count).map_err(|e| truncated(e, 0))?;
        let count = u32::from_le_bytes(count) as usize;
        let mut tables = Vec::with_capacity(count.min(TABLE_COUNT));
        for idx in 0..count {
            let mut table = zeroed_table();
            r.read_exact(bytemuck::cast_slice_mut(&mut table[..])).map_err(|e| truncated(e, idx))?;
            if cfg!(target_endian = "big") {
                for weight in table.iter_mut() {
                    *weight = f32::from_bits(u32::from_le(weight.to_bits()));
                }
            }
            tables.push(table);
        }
        Ok(Self { tables })
    }

    /// Save to `path`, truncating any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WeightError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|source| WeightError::Open { path: path.to_path_buf(), source })?;
        self.write_to(BufWriter::new(file))?;
        info!(path = %path.display(), tables = self.tables.len(), "saved weights");
        Ok(())
    }

    /// Load from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WeightError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|source| WeightError::Open { path: path.to_path_buf(), source })?;
        let net = Self::read_from(BufReader::new(file))?;
        info!(path = %path.display(), tables = net.tables.len(), "loaded weights");
        Ok(net)
    }
}

impl Default for NTupleNetwork { fn default() -> Self { Self::new() } }

fn truncated(e: io::Error, table: usize) -> WeightError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => WeightError::Truncated { table },
        _ => WeightError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample() -> Board {
        Board::from_cells([1, 2, 3, 0, 0, 4, 0, 5, 2, 0, 0, 1, 6, 0, 3, 0])
    }

    #[test]
    fn isomorphism_order() {
        let b = sample();
        let images = isomorphisms(&b);
        assert_eq!(images[0], b);
        let mut r = b;
        r.rotate_right();
        assert_eq!(images[1], r);
        let mut h = b;
        h.reflect_horizontal();
        assert_eq!(images[4], h);
        h.rotate_right();
        assert_eq!(images[5], h);
    }

    #[test]
    fn tuple_keys_pack_most_significant_first() {
        let b = Board::from_cells([1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0]);
        assert_eq!(tuple_key(&b, &PATTERNS[0]), 0x123456);
        assert_eq!(tuple_key(&b, &PATTERNS[1]), 0x789abc);
        assert_eq!(tuple_key(&b, &PATTERNS[2]), 0x60089a);
        assert_eq!(tuple_key(&b, &PATTERNS[3]), 0x89ac00);
    }

    #[test]
    fn canonical_form_is_orbit_invariant() {
        let b = sample();
        let c = canonicalize(&b);
        assert!(isomorphisms(&b).iter().any(|s| *s == c));
        for s in isomorphisms(&b) {
            assert_eq!(canonicalize(&s), c);
            assert!(s.raw() <= c.raw());
        }
        // All images equal: the board itself is returned.
        assert_eq!(canonicalize(&Board::EMPTY), Board::EMPTY);
    }

    #[test]
    fn increment_then_evaluate() {
        let mut net = NTupleNetwork::new();
        let b = sample();
        assert_eq!(net.evaluate(&b), 0.0);
        net.increment(&b, 0.5);
        assert_eq!(net.evaluate(&b), 16.0);
        net.increment(&b, -0.25);
        assert_eq!(net.evaluate(&b), 8.0);
        assert_eq!(net.evaluate(&Board::EMPTY), 0.0);
    }

    #[test]
    fn canonical_value_is_orbit_invariant() {
        let mut net = NTupleNetwork::new();
        net.increment(&canonicalize(&sample()), 1.0);
        net.increment(&Board::from_raw(0x0000_0000_0003_0021), 0.75);
        let v = net.value(&sample());
        assert!(v >= 32.0);
        for s in isomorphisms(&sample()) {
            assert_eq!(net.value(&s), v);
            assert_eq!(net.evaluate(&canonicalize(&s)), net.evaluate(&canonicalize(&sample())));
        }
    }

    #[test]
    fn short_network_visits_existing_tables() {
        let mut net = NTupleNetwork::zeroed(3);
        net.increment(&sample(), 1.0);
        assert_eq!(net.evaluate(&sample()), 3.0);
    }

    #[test]
    fn save_and_load_preserve_weights() {
        let mut net = NTupleNetwork::zeroed(1);
        let b = sample();
        net.increment(&b, 2.5);
        let tmp = NamedTempFile::new().unwrap();
        net.save(tmp.path()).unwrap();
        let len = std::fs::metadata(tmp.path()).unwrap().len();
        assert_eq!(len, 4 + 4 * TABLE_LEN as u64);

        let loaded = NTupleNetwork::load(tmp.path()).unwrap();
        assert_eq!(loaded.table_count(), 1);
        assert_eq!(loaded.evaluate(&b), 2.5);
    }

    #[test]
    fn load_failures() {
        let err = NTupleNetwork::load("/nonexistent/dir/weights.bin").err().unwrap();
        assert!(matches!(err, WeightError::Open { .. }));

        let err = NTupleNetwork::read_from(&[1u8, 0][..]).err().unwrap();
        assert!(matches!(err, WeightError::Truncated { table: 0 }));

        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let err = NTupleNetwork::read_from(&bytes[..]).err().unwrap();
        assert!(matches!(err, WeightError::Truncated { table: 0 }));

        let empty = NTupleNetwork::read_from(&0u32.to_le_bytes()[..]).unwrap();
        assert_eq!(empty.table_count(), 0);
    }
}
