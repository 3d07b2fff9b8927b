//! Playfield Grid
//!
//! The 10-wide board with 20 visible rows plus 4 hidden buffer rows above
//! them. Row 0 is the bottom. Provides row clearing, garbage insertion and
//! the collision surface the active piece moves against.

use serde::{Deserialize, Serialize};

use super::piece::{Piece, PieceKind};

/// Board width in cells.
pub const BOARD_WIDTH: usize = 10;
/// Visible board height in rows.
pub const BOARD_HEIGHT: usize = 20;
/// Hidden buffer rows above the visible area.
pub const BOARD_BUFFER: usize = 4;
/// Total rows including the buffer.
pub const BOARD_ROWS: usize = BOARD_HEIGHT + BOARD_BUFFER;

/// One cell of the grid.
///
/// Discriminants are the snapshot wire values: 0 empty, 1..=7 the piece
/// kinds, 8 garbage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cell {
    /// Unoccupied.
    #[default]
    Empty = 0,
    /// Locked I piece material.
    I = 1,
    /// Locked O piece material.
    O = 2,
    /// Locked T piece material.
    T = 3,
    /// Locked S piece material.
    S = 4,
    /// Locked Z piece material.
    Z = 5,
    /// Locked J piece material.
    J = 6,
    /// Locked L piece material.
    L = 7,
    /// Garbage sent by an opponent.
    Garbage = 8,
}

impl From<PieceKind> for Cell {
    fn from(kind: PieceKind) -> Self {
        match kind {
            PieceKind::I => Cell::I,
            PieceKind::O => Cell::O,
            PieceKind::T => Cell::T,
            PieceKind::S => Cell::S,
            PieceKind::Z => Cell::Z,
            PieceKind::J => Cell::J,
            PieceKind::L => Cell::L,
        }
    }
}

/// The playfield grid.
///
/// Indexed `grid[y][x]` with y=0 at the bottom; rows `BOARD_HEIGHT..` are
/// the hidden buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    grid: [[Cell; BOARD_WIDTH]; BOARD_ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self {
            grid: [[Cell::Empty; BOARD_WIDTH]; BOARD_ROWS],
        }
    }

    /// Set every cell to empty.
    pub fn clear(&mut self) {
        self.grid = [[Cell::Empty; BOARD_WIDTH]; BOARD_ROWS];
    }

    /// True when (x, y) lies on the grid (buffer rows included).
    #[inline]
    pub fn in_bounds(x: i32, y: i32) -> bool {
        x >= 0 && x < BOARD_WIDTH as i32 && y >= 0 && y < BOARD_ROWS as i32
    }

    /// Cell value at (x, y); out-of-bounds reads as empty.
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if !Self::in_bounds(x, y) {
            return Cell::Empty;
        }
        self.grid[y as usize][x as usize]
    }

    /// Write a cell value; false when (x, y) is out of bounds.
    pub fn set_cell(&mut self, x: i32, y: i32, value: Cell) -> bool {
        if !Self::in_bounds(x, y) {
            return false;
        }
        self.grid[y as usize][x as usize] = value;
        true
    }

    /// True when every cell of row y is occupied.
    pub fn is_row_full(&self, y: i32) -> bool {
        if y < 0 || y >= BOARD_ROWS as i32 {
            return false;
        }
        self.grid[y as usize].iter().all(|&c| c != Cell::Empty)
    }

    /// True when no cell of row y is occupied; out-of-range rows read empty.
    pub fn is_row_empty(&self, y: i32) -> bool {
        if y < 0 || y >= BOARD_ROWS as i32 {
            return true;
        }
        self.grid[y as usize].iter().all(|&c| c == Cell::Empty)
    }

    /// Remove row y, shifting every row above it down one.
    pub fn clear_row(&mut self, y: i32) {
        if y < 0 || y >= BOARD_ROWS as i32 {
            return;
        }
        for row in y as usize..BOARD_ROWS - 1 {
            self.grid[row] = self.grid[row + 1];
        }
        self.grid[BOARD_ROWS - 1] = [Cell::Empty; BOARD_WIDTH];
    }

    /// Clear every full row, bottom to top, and return how many were
    /// removed. Re-checks an index after the shift so stacked full rows all
    /// clear in one pass.
    pub fn clear_full_rows(&mut self) -> usize {
        let mut cleared = 0;
        let mut y = 0;
        while y < BOARD_ROWS as i32 {
            if self.is_row_full(y) {
                self.clear_row(y);
                cleared += 1;
            } else {
                y += 1;
            }
        }
        cleared
    }

    /// Insert garbage rows at the bottom, each solid except for the hole
    /// column. Fails (without modifying the board) when the topmost `lines`
    /// rows are not empty, because the shift would push material out of the
    /// grid.
    pub fn add_garbage_lines(&mut self, lines: usize, hole_column: i32) -> bool {
        if lines == 0 || lines > BOARD_ROWS || hole_column < 0 || hole_column >= BOARD_WIDTH as i32
        {
            return false;
        }

        // would the shift push blocks out the top?
        for y in BOARD_ROWS - lines..BOARD_ROWS {
            if !self.is_row_empty(y as i32) {
                return false;
            }
        }

        for y in (lines..BOARD_ROWS).rev() {
            self.grid[y] = self.grid[y - lines];
        }

        for y in 0..lines {
            for x in 0..BOARD_WIDTH {
                self.grid[y][x] = if x as i32 == hole_column {
                    Cell::Empty
                } else {
                    Cell::Garbage
                };
            }
        }

        true
    }

    /// True when any buffer row holds material (the top-out condition).
    pub fn has_blocks_above_visible(&self) -> bool {
        (BOARD_HEIGHT..BOARD_ROWS).any(|y| !self.is_row_empty(y as i32))
    }

    /// Height of the tallest block in column x (0 when the column is empty).
    pub fn column_height(&self, x: i32) -> usize {
        if x < 0 || x >= BOARD_WIDTH as i32 {
            return 0;
        }
        for y in (0..BOARD_ROWS).rev() {
            if self.grid[y][x as usize] != Cell::Empty {
                return y + 1;
            }
        }
        0
    }

    /// Height of the tallest block on the board.
    pub fn stack_height(&self) -> usize {
        (0..BOARD_WIDTH as i32)
            .map(|x| self.column_height(x))
            .max()
            .unwrap_or(0)
    }

    /// True when every cell of the piece lies on the grid and is free.
    pub fn fits(&self, piece: &Piece) -> bool {
        piece
            .cells()
            .iter()
            .all(|&(x, y)| Self::in_bounds(x, y) && self.cell(x, y) == Cell::Empty)
    }

    /// Write the piece's cells into the grid. Cells outside the grid are
    /// ignored; callers check [`Board::fits`] first.
    pub fn lock(&mut self, piece: &Piece) {
        let material = Cell::from(piece.kind());
        for (x, y) in piece.cells() {
            self.set_cell(x, y, material);
        }
    }

    /// Raw grid rows for serialization or rendering.
    pub fn grid(&self) -> &[[Cell; BOARD_WIDTH]; BOARD_ROWS] {
        &self.grid
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(board: &mut Board, y: i32) {
        for x in 0..BOARD_WIDTH as i32 {
            board.set_cell(x, y, Cell::Garbage);
        }
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.stack_height(), 0);
        assert!(!board.has_blocks_above_visible());
        for y in 0..BOARD_ROWS as i32 {
            assert!(board.is_row_empty(y));
        }
    }

    #[test]
    fn test_cell_roundtrip_and_bounds() {
        let mut board = Board::new();
        assert!(board.set_cell(4, 7, Cell::T));
        assert_eq!(board.cell(4, 7), Cell::T);

        // out-of-bounds reads empty, writes are rejected
        assert_eq!(board.cell(-1, 0), Cell::Empty);
        assert_eq!(board.cell(0, BOARD_ROWS as i32), Cell::Empty);
        assert!(!board.set_cell(BOARD_WIDTH as i32, 0, Cell::I));
    }

    #[test]
    fn test_row_full_detection() {
        let mut board = Board::new();
        fill_row(&mut board, 0);
        assert!(board.is_row_full(0));
        board.set_cell(3, 0, Cell::Empty);
        assert!(!board.is_row_full(0));
        assert!(!board.is_row_full(-1));
        assert!(!board.is_row_full(BOARD_ROWS as i32));
    }

    #[test]
    fn test_clear_row_shifts_down() {
        let mut board = Board::new();
        fill_row(&mut board, 0);
        board.set_cell(2, 1, Cell::J);

        board.clear_row(0);
        assert_eq!(board.cell(2, 0), Cell::J);
        assert!(board.is_row_empty(1));
    }

    #[test]
    fn test_clear_full_rows_handles_stacked_rows() {
        let mut board = Board::new();
        fill_row(&mut board, 0);
        fill_row(&mut board, 1);
        board.set_cell(0, 2, Cell::S);
        board.set_cell(1, 2, Cell::S);

        let cleared = board.clear_full_rows();
        assert_eq!(cleared, 2);
        // the partial row landed on the floor
        assert_eq!(board.cell(0, 0), Cell::S);
        assert_eq!(board.cell(1, 0), Cell::S);
        assert!(board.is_row_empty(1));
    }

    #[test]
    fn test_clear_full_rows_none_full() {
        let mut board = Board::new();
        board.set_cell(0, 0, Cell::Z);
        assert_eq!(board.clear_full_rows(), 0);
        assert_eq!(board.cell(0, 0), Cell::Z);
    }

    #[test]
    fn test_garbage_lines_shift_stack_up() {
        let mut board = Board::new();
        board.set_cell(0, 0, Cell::L);

        assert!(board.add_garbage_lines(2, 3));
        // previous floor cell moved up by two
        assert_eq!(board.cell(0, 2), Cell::L);
        // garbage rows are solid except the hole
        for y in 0..2 {
            for x in 0..BOARD_WIDTH as i32 {
                let expected = if x == 3 { Cell::Empty } else { Cell::Garbage };
                assert_eq!(board.cell(x, y), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_garbage_rejected_when_top_occupied() {
        let mut board = Board::new();
        board.set_cell(5, BOARD_ROWS as i32 - 1, Cell::Garbage);

        let before = board.clone();
        assert!(!board.add_garbage_lines(1, 0));
        assert_eq!(board, before);
    }

    #[test]
    fn test_garbage_argument_validation() {
        let mut board = Board::new();
        assert!(!board.add_garbage_lines(0, 3));
        assert!(!board.add_garbage_lines(1, -1));
        assert!(!board.add_garbage_lines(1, BOARD_WIDTH as i32));
        assert!(!board.add_garbage_lines(BOARD_ROWS + 1, 3));
    }

    #[test]
    fn test_top_out_detection() {
        let mut board = Board::new();
        board.set_cell(4, BOARD_HEIGHT as i32 - 1, Cell::I);
        assert!(!board.has_blocks_above_visible());
        board.set_cell(4, BOARD_HEIGHT as i32, Cell::I);
        assert!(board.has_blocks_above_visible());
    }

    #[test]
    fn test_column_and_stack_height() {
        let mut board = Board::new();
        board.set_cell(2, 5, Cell::T);
        assert_eq!(board.column_height(2), 6);
        assert_eq!(board.column_height(3), 0);
        assert_eq!(board.stack_height(), 6);
        assert_eq!(board.column_height(-1), 0);
    }

    #[test]
    fn test_piece_fits_and_locks() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(PieceKind::T);
        assert!(board.fits(&piece));

        // drop to the floor
        while piece.try_shift(&board, 0, -1) {}
        assert_eq!(piece.y(), 1);

        board.lock(&piece);
        assert_eq!(board.cell(4, 1), Cell::T);
        assert_eq!(board.cell(3, 0), Cell::T);
        assert_eq!(board.cell(4, 0), Cell::T);
        assert_eq!(board.cell(5, 0), Cell::T);
        assert!(!board.fits(&piece));
    }

    #[test]
    fn test_rotation_blocked_when_walled_in() {
        let mut board = Board::new();
        // fill everything, then carve exactly the spawn T; no rotation of a
        // T fits inside its own silhouette, so every kick must fail
        for y in 0..BOARD_ROWS as i32 {
            fill_row(&mut board, y);
        }
        let mut piece = Piece::spawn(PieceKind::T);
        for (x, y) in piece.cells() {
            board.set_cell(x, y, Cell::Empty);
        }
        assert!(board.fits(&piece));

        let before = piece;
        assert!(!piece.try_rotate_cw(&board));
        assert!(!piece.try_rotate_ccw(&board));
        assert!(!piece.try_rotate_180(&board));
        assert_eq!(piece, before);
    }
}
