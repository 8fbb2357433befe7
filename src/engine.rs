use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// A direction to slide tiles, with its opcode as discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Move {
    /// All moves in opcode order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    #[inline]
    pub fn opcode(self) -> u8 { self as u8 }
}

impl TryFrom<u8> for Move {
    type Error = u8;

    fn try_from(op: u8) -> Result<Self, Self::Error> {
        match op {
            0 => Ok(Move::Up),
            1 => Ok(Move::Right),
            2 => Ok(Move::Down),
            3 => Ok(Move::Left),
            other => Err(other),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Up => "up",
            Move::Right => "right",
            Move::Down => "down",
            Move::Left => "left",
        };
        f.write_str(s)
    }
}

/// How a board reached its current grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastMove {
    /// Fresh board, no slide attempted yet.
    #[default]
    Initial,
    /// The last slide succeeded in this direction.
    Slid(Move),
    /// The last slide was rejected.
    Illegal,
}

/// Merge count of a slide, or [`ILLEGAL`] for a rejected action.
pub type Reward = i32;

/// Sentinel reward for a rejected slide or placement.
pub const ILLEGAL: Reward = -1;

/// Tile codes the environment may place.
pub const PLACEABLE: [u8; 3] = [1, 2, 3];

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit rows

struct Stores {
    slide_left: Box<[u16]>,
    merges: Box<[u8]>,
}

type BoardRaw = u64;
type Line = u16;

/// Packed 4x4 Threes board: 16 4-bit cell codes in a `u64`.
///
/// Cell `i` (row-major, `i = 4 * row + col`) lives in bits `4i..4i+4`, so the
/// raw value is also the integer compared when canonicalizing. Code 0 is
/// empty, codes 1 and 2 are the literal tiles, and code `k >= 3` shows
/// `3 * 2^(k - 3)`.
///
/// Besides the grid a board carries an opaque `info` tag and the
/// [`LastMove`] marker. Neither takes part in equality, ordering or hashing.
#[derive(Clone, Copy, Default)]
pub struct Board {
    grid: BoardRaw,
    info: u64,
    last: LastMove,
}

impl Board {
    /// A constant empty board in the `Initial` state.
    pub const EMPTY: Board = Board { grid: 0, info: 0, last: LastMove::Initial };

    /// Construct a fresh board from its raw packed grid.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board { grid: raw, ..Board::EMPTY } }

    /// Construct a fresh board from 16 row-major cell codes (each masked to 4 bits).
    pub fn from_cells(cells: [u8; 16]) -> Self {
        let raw = cells
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &c)| acc | (u64::from(c & 0xf) << (4 * i)));
        Board::from_raw(raw)
    }

    /// The raw packed grid.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.grid }

    /// Consume this board, returning the raw packed grid.
    #[inline]
    pub fn into_raw(self) -> BoardRaw { self.grid }

    /// Row-major cell codes.
    pub fn cells(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.cell(i);
        }
        out
    }

    /// Code of cell `idx` (0..16, row-major).
    #[inline]
    pub fn cell(&self, idx: usize) -> u8 { ((self.grid >> (4 * idx)) & 0xf) as u8 }

    #[inline]
    fn set_cell(&mut self, idx: usize, code: u8) {
        let shift = 4 * idx;
        self.grid = (self.grid & !(0xf << shift)) | (u64::from(code & 0xf) << shift);
    }

    /// Caller bookkeeping tag.
    #[inline]
    pub fn info(&self) -> u64 { self.info }

    /// Replace the tag, returning the old one.
    #[inline]
    pub fn set_info(&mut self, info: u64) -> u64 { std::mem::replace(&mut self.info, info) }

    #[inline]
    pub fn last_move(&self) -> LastMove { self.last }

    /// Place a tile code at `pos`.
    ///
    /// Returns 0, or [`ILLEGAL`] if `pos >= 16` or `code` is not placeable.
    /// The target cell is expected to be empty; that is not checked here.
    pub fn place(&mut self, pos: usize, code: u8) -> Reward {
        if pos >= 16 || !PLACEABLE.contains(&code) {
            return ILLEGAL;
        }
        self.set_cell(pos, code);
        0
    }

    /// Apply a slide in place and return its merge count, or [`ILLEGAL`] if
    /// the grid did not change. Updates the last-move marker either way.
    ///
    /// ```
    /// use threes_td::engine::{Board, Move};
    /// let mut b = Board::from_cells([1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    /// assert_eq!(b.slide(Move::Left), 1);
    /// assert_eq!(b.cell(0), 3);
    /// ```
    pub fn slide(&mut self, dir: Move) -> Reward {
        let reward = match dir {
            Move::Up => self.slide_up(),
            Move::Right => self.slide_right(),
            Move::Down => self.slide_down(),
            Move::Left => self.slide_left(),
        };
        self.last = if reward == ILLEGAL { LastMove::Illegal } else { LastMove::Slid(dir) };
        reward
    }

    /// Opcode form of [`Board::slide`]; opcodes outside 0..=3 are rejected.
    pub fn slide_raw(&mut self, opcode: u8) -> Reward {
        match Move::try_from(opcode) {
            Ok(dir) => self.slide(dir),
            Err(_) => {
                self.last = LastMove::Illegal;
                ILLEGAL
            }
        }
    }

    /// The afterstate and reward of `dir`, or `None` when the slide is illegal.
    #[inline]
    pub fn after(self, dir: Move) -> Option<(Board, Reward)> {
        let mut next = self;
        let reward = next.slide(dir);
        (reward != ILLEGAL).then_some((next, reward))
    }

    fn slide_left(&mut self) -> Reward {
        let prev = self.grid;
        let s = stores();
        let mut grid = 0u64;
        let mut score: Reward = 0;
        for row in 0..4 {
            let line = extract_line(prev, row) as usize;
            grid |= u64::from(get_line_entry(&s.slide_left, line)) << (16 * row);
            score += Reward::from(s.merges[line]);
        }
        self.grid = grid;
        if grid != prev { score } else { ILLEGAL }
    }

    fn slide_right(&mut self) -> Reward {
        self.reflect_horizontal();
        let score = self.slide_left();
        self.reflect_horizontal();
        score
    }

    fn slide_up(&mut self) -> Reward {
        self.rotate_right();
        let score = self.slide_right();
        self.rotate_left();
        score
    }

    fn slide_down(&mut self) -> Reward {
        self.rotate_right();
        let score = self.slide_left();
        self.rotate_left();
        score
    }

    /// Swap rows and columns.
    #[inline]
    pub fn transpose(&mut self) { self.grid = transpose(self.grid); }

    /// Mirror left to right.
    #[inline]
    pub fn reflect_horizontal(&mut self) {
        let x = self.grid;
        self.grid = ((x & 0x000F_000F_000F_000F) << 12)
            | ((x & 0x00F0_00F0_00F0_00F0) << 4)
            | ((x >> 4) & 0x00F0_00F0_00F0_00F0)
            | ((x >> 12) & 0x000F_000F_000F_000F);
    }

    /// Mirror top to bottom.
    #[inline]
    pub fn reflect_vertical(&mut self) {
        let x = self.grid;
        self.grid = (x << 48) | ((x & 0xFFFF_0000) << 16) | ((x >> 16) & 0xFFFF_0000) | (x >> 48);
    }

    /// Rotate 90° clockwise.
    #[inline]
    pub fn rotate_right(&mut self) {
        self.transpose();
        self.reflect_horizontal();
    }

    /// Rotate 90° counterclockwise.
    #[inline]
    pub fn rotate_left(&mut self) {
        self.transpose();
        self.reflect_vertical();
    }

    /// Rotate 180°.
    #[inline]
    pub fn reverse(&mut self) {
        self.reflect_horizontal();
        self.reflect_vertical();
    }

    /// Rotate clockwise `times` quarter turns (negative turns counterclockwise).
    pub fn rotate(&mut self, times: i32) {
        match times.rem_euclid(4) {
            1 => self.rotate_right(),
            2 => self.reverse(),
            3 => self.rotate_left(),
            _ => {}
        }
    }

    /// Count the number of empty cells.
    #[inline]
    pub fn count_empty(&self) -> u32 { 16 - count_non_empty(self.grid) }

    /// Displayed value of cell `idx`: 0, 1, 2 or `3 * 2^(code - 3)`.
    #[inline]
    pub fn tile_value(&self, idx: usize) -> u32 { code_to_value(self.cell(idx)) }

    /// Highest displayed value on the board.
    pub fn highest_tile(&self) -> u32 {
        (0..16).map(|i| self.tile_value(i)).max().unwrap_or(0)
    }

    /// True if no slide in any direction changes the grid.
    pub fn is_game_over(&self) -> bool {
        Move::ALL.iter().all(|&dir| self.after(dir).is_none())
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool { self.grid == other.grid }
}

impl Eq for Board {}

impl PartialOrd for Board {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Board {
    fn cmp(&self, other: &Self) -> Ordering { self.grid.cmp(&other.grid) }
}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) { self.grid.hash(state); }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x}, {:?})", self.grid, self.last)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------------------------+")?;
        for row in 0..4 {
            write!(f, "|")?;
            for col in 0..4 {
                write!(f, "{:>6}", self.tile_value(4 * row + col))?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "+------------------------+")
    }
}

impl From<BoardRaw> for Board { fn from(v: BoardRaw) -> Self { Board::from_raw(v) } }
impl From<Board> for BoardRaw { fn from(b: Board) -> Self { b.into_raw() } }

/// Initialize the row lookup tables. Safe to call multiple times; slides
/// also initialize them lazily on first use.
pub fn new() {
    stores();
}

/// Displayed value of a cell code.
#[inline]
pub fn code_to_value(code: u8) -> u32 {
    match code {
        0..=2 => u32::from(code),
        k => 3 << (k - 3),
    }
}

// Credit to Nneonneo. Transposing commutes with the 180° turn that reversing
// nibble order amounts to, so the trick holds for either cell ordering.
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

#[inline]
pub(crate) fn extract_line(board: BoardRaw, row: usize) -> Line {
    ((board >> (16 * row)) & 0xffff) as Line
}

static STORES: OnceLock<Stores> = OnceLock::new();

#[inline(always)]
fn stores() -> &'static Stores {
    STORES.get_or_init(create_stores)
}

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut slide_left = vec![0u16; LINE_TABLE_SIZE];
    let mut merges = vec![0u8; LINE_TABLE_SIZE];
    for (val, (out, count)) in slide_left.iter_mut().zip(merges.iter_mut()).enumerate() {
        let (line, merged) = slide_line_left(val as Line);
        *out = line;
        *count = merged;
    }
    Stores {
        slide_left: slide_left.into_boxed_slice(),
        merges: merges.into_boxed_slice(),
    }
}

#[inline(always)]
fn get_line_entry(table: &[u16], idx: usize) -> u16 {
    debug_assert!(idx < LINE_TABLE_SIZE);
    table[idx]
}

fn line_to_cells(line: Line) -> [u8; 4] {
    [0, 1, 2, 3].map(|c| ((line >> (4 * c)) & 0xf) as u8)
}

fn cells_to_line(cells: [u8; 4]) -> Line {
    cells.iter().enumerate().fold(0, |acc, (c, &v)| acc | (Line::from(v) << (4 * c)))
}

/// One cascading pass over adjacent pairs, column 0 first.
fn slide_line_left(line: Line) -> (Line, u8) {
    let mut row = line_to_cells(line);
    let mut merged = 0u8;
    for c in 0..3 {
        if row[c] == 0 {
            row[c] = row[c + 1];
            row[c + 1] = 0;
        } else if (row[c] == 1 && row[c + 1] == 2) || (row[c] == 2 && row[c + 1] == 1) {
            row[c] = 3;
            row[c + 1] = 0;
            merged += 1;
        } else if row[c] > 2 && row[c] == row[c + 1] && row[c] < 0xf {
            row[c] += 1;
            row[c + 1] = 0;
            merged += 1;
        }
    }
    (cells_to_line(row), merged)
}

fn count_non_empty(board: BoardRaw) -> u32 {
    let mut board_copy = board;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: [u8; 4]) -> Board {
        let mut all = [0u8; 16];
        all[..4].copy_from_slice(&cells);
        Board::from_cells(all)
    }

    fn first_row(b: &Board) -> [u8; 4] { [b.cell(0), b.cell(1), b.cell(2), b.cell(3)] }

    #[test]
    fn it_slide_line_left() {
        assert_eq!(slide_line_left(cells_to_line([0, 0, 0, 0])), (cells_to_line([0, 0, 0, 0]), 0));
        assert_eq!(slide_line_left(cells_to_line([1, 2, 0, 0])), (cells_to_line([3, 0, 0, 0]), 1));
        assert_eq!(slide_line_left(cells_to_line([2, 1, 0, 0])), (cells_to_line([3, 0, 0, 0]), 1));
        assert_eq!(slide_line_left(cells_to_line([3, 3, 0, 0])), (cells_to_line([4, 0, 0, 0]), 1));
        assert_eq!(slide_line_left(cells_to_line([1, 0, 2, 0])), (cells_to_line([1, 2, 0, 0]), 0));
        // Equal low codes never merge with each other.
        assert_eq!(slide_line_left(cells_to_line([1, 1, 0, 0])), (cells_to_line([1, 1, 0, 0]), 0));
        assert_eq!(slide_line_left(cells_to_line([2, 2, 1, 1])), (cells_to_line([2, 3, 1, 0]), 1));
        // One pass: a shifted tile does not cascade into a second merge.
        assert_eq!(slide_line_left(cells_to_line([3, 3, 3, 3])), (cells_to_line([4, 3, 3, 0]), 1));
        assert_eq!(slide_line_left(cells_to_line([0, 3, 3, 0])), (cells_to_line([3, 3, 0, 0]), 0));
        assert_eq!(slide_line_left(cells_to_line([4, 1, 2, 5])), (cells_to_line([4, 3, 5, 0]), 1));
    }

    #[test]
    fn test_slide_row_examples() {
        let mut b = row([1, 2, 0, 0]);
        assert_eq!(b.slide(Move::Left), 1);
        assert_eq!(first_row(&b), [3, 0, 0, 0]);

        let mut b = row([3, 3, 0, 0]);
        assert_eq!(b.slide(Move::Left), 1);
        assert_eq!(first_row(&b), [4, 0, 0, 0]);

        let mut b = row([1, 0, 2, 0]);
        assert_eq!(b.slide(Move::Left), 0);
        assert_eq!(first_row(&b), [1, 2, 0, 0]);
        assert_eq!(b.last_move(), LastMove::Slid(Move::Left));
    }

    #[test]
    fn test_illegal_slide() {
        let mut b = row([1, 3, 1, 3]);
        let before = b;
        assert_eq!(b.slide(Move::Left), ILLEGAL);
        assert_eq!(b, before);
        assert_eq!(b.last_move(), LastMove::Illegal);
        assert_eq!(b.slide_raw(7), ILLEGAL);
        assert!(Board::EMPTY.is_game_over());
    }

    #[test]
    fn test_slide_all_directions() {
        // 1 0 0 0
        // 0 0 0 0
        // 0 0 0 0
        // 0 0 0 2
        let base = Board::from_cells([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

        let mut b = base;
        assert_eq!(b.slide(Move::Right), 0);
        assert_eq!(b.cells(), [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

        let mut b = base;
        assert_eq!(b.slide(Move::Left), 0);
        assert_eq!(b.cells(), [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0]);

        let mut b = base;
        assert_eq!(b.slide(Move::Down), 0);
        assert_eq!(b.cells(), [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

        let mut b = base;
        assert_eq!(b.slide(Move::Up), 0);
        assert_eq!(b.cells(), [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn test_slide_merges_vertically() {
        // column 0 holds 1 over 2; up merges it into row 0
        let mut b = Board::from_cells([1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(b.slide(Move::Up), 1);
        assert_eq!(b.cell(0), 3);
        assert_eq!(b.cell(4), 0);

        let mut b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 5, 0, 0, 0]);
        assert_eq!(b.slide(Move::Down), 1);
        assert_eq!(b.cell(12), 6);
        assert_eq!(b.cell(8), 0);
    }

    #[test]
    fn test_symmetry_identities() {
        let b = Board::from_raw(0x0123_4567_89ab_cdef);
        let mut r = b;
        for _ in 0..4 { r.rotate_right(); }
        assert_eq!(r, b);

        let mut h = b;
        h.reflect_horizontal();
        assert_ne!(h, b);
        h.reflect_horizontal();
        assert_eq!(h, b);

        let mut rev = b;
        rev.reverse();
        let mut twice = b;
        twice.rotate_right();
        twice.rotate_right();
        assert_eq!(rev, twice);

        let mut l = b;
        l.rotate_left();
        l.rotate_right();
        assert_eq!(l, b);

        let mut n = b;
        n.rotate(-1);
        let mut l = b;
        l.rotate_left();
        assert_eq!(n, l);
    }

    #[test]
    fn test_transforms_match_cell_definitions() {
        let b = Board::from_raw(0x0123_4567_89ab_cdef);
        let mut t = b;
        t.transpose();
        let mut h = b;
        h.reflect_horizontal();
        let mut v = b;
        v.reflect_vertical();
        let mut r = b;
        r.rotate_right();
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(t.cell(4 * row + col), b.cell(4 * col + row));
                assert_eq!(h.cell(4 * row + col), b.cell(4 * row + 3 - col));
                assert_eq!(v.cell(4 * row + col), b.cell(4 * (3 - row) + col));
                assert_eq!(r.cell(4 * row + col), b.cell(4 * (3 - col) + row));
            }
        }
    }

    #[test]
    fn test_place() {
        let mut b = Board::EMPTY;
        assert_eq!(b.place(16, 1), ILLEGAL);
        assert_eq!(b.place(0, 0), ILLEGAL);
        assert_eq!(b.place(0, 4), ILLEGAL);
        assert_eq!(b, Board::EMPTY);
        assert_eq!(b.place(5, 3), 0);
        assert_eq!(b.cell(5), 3);
        assert_eq!(b.count_empty(), 15);
        assert_eq!(b.last_move(), LastMove::Initial);
    }

    #[test]
    fn test_equality_ignores_bookkeeping() {
        let mut a = Board::from_raw(0x21);
        let b = Board::from_raw(0x21);
        a.set_info(99);
        a.slide(Move::Right);
        a.slide(Move::Left);
        assert_eq!(a.info(), 99);
        assert_eq!(a, b);
    }

    #[test]
    fn it_tile_values_and_display() {
        assert_eq!(code_to_value(0), 0);
        assert_eq!(code_to_value(2), 2);
        assert_eq!(code_to_value(3), 3);
        assert_eq!(code_to_value(4), 6);
        assert_eq!(code_to_value(5), 12);
        let b = Board::from_cells([0, 1, 2, 3, 4, 5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(b.highest_tile(), 12);
        let text = b.to_string();
        assert!(text.starts_with("+------------------------+\n|     0     1     2     3|\n"));
        assert!(text.contains("|     6    12     0     0|"));
    }

    #[test]
    fn it_count_empty() {
        assert_eq!(Board::EMPTY.count_empty(), 16);
        assert_eq!(Board::from_raw(0x1111000011110000).count_empty(), 8);
    }
}
