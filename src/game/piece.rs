//! Pieces and SRS Rotation Data
//!
//! The seven piece kinds, their cell layouts per rotation state, and the
//! SRS wall-kick tables (separate tables for I and for J/L/S/T/Z, plus
//! 6-offset tables for 180 rotations). Kick offsets use board coordinates:
//! positive y is up.

use serde::{Deserialize, Serialize};

use super::board::Board;

/// Number of distinct piece kinds in one bag.
pub const PIECE_KIND_COUNT: usize = 7;

/// The seven playable piece kinds.
///
/// Discriminants match the cell values used in board snapshots (1..=7);
/// 0 is the empty cell and 8 is garbage, neither of which is a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PieceKind {
    /// The 4x1 line piece.
    I = 1,
    /// The 2x2 square piece.
    O = 2,
    /// The T piece.
    T = 3,
    /// The S piece.
    S = 4,
    /// The Z piece.
    Z = 5,
    /// The J piece.
    J = 6,
    /// The L piece.
    L = 7,
}

impl PieceKind {
    /// All kinds in bag order.
    pub const ALL: [PieceKind; PIECE_KIND_COUNT] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Table index for this kind (0..=6).
    #[inline]
    fn index(self) -> usize {
        (self as u8 - 1) as usize
    }

    /// Spawn position for this kind.
    ///
    /// All pieces spawn at x=3; the I piece sits one row lower because its
    /// filled row is the second row of its box.
    #[inline]
    pub fn spawn_position(self) -> (i32, i32) {
        match self {
            PieceKind::I => (3, 19),
            _ => (3, 20),
        }
    }
}

/// Rotation states per the SRS standard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rotation {
    /// Spawn state.
    #[default]
    R0 = 0,
    /// Clockwise from spawn.
    R1 = 1,
    /// 180 from spawn.
    R2 = 2,
    /// Counter-clockwise from spawn.
    R3 = 3,
}

impl Rotation {
    /// State after a clockwise rotation.
    #[inline]
    pub fn cw(self) -> Rotation {
        Rotation::from_index((self as u8 + 1) % 4)
    }

    /// State after a counter-clockwise rotation.
    #[inline]
    pub fn ccw(self) -> Rotation {
        Rotation::from_index((self as u8 + 3) % 4)
    }

    /// State after a 180 rotation.
    #[inline]
    pub fn half_turn(self) -> Rotation {
        Rotation::from_index((self as u8 + 2) % 4)
    }

    #[inline]
    fn from_index(idx: u8) -> Rotation {
        match idx % 4 {
            0 => Rotation::R0,
            1 => Rotation::R1,
            2 => Rotation::R2,
            _ => Rotation::R3,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

// =============================================================================
// SRS SHAPE DATA
// =============================================================================

/// Cell layouts for every kind and rotation, one nibble row per entry.
///
/// Each shape is a 4x4 box; row 0 is the top of the box and bit 3 is the
/// leftmost column, so the binary literals read like the shape itself.
/// Board cells are derived as `(piece_x + col, piece_y - row)`.
static SHAPES: [[[u8; 4]; 4]; PIECE_KIND_COUNT] = [
    // I
    [
        [0b0000, 0b1111, 0b0000, 0b0000], // R0: horizontal, second row
        [0b0010, 0b0010, 0b0010, 0b0010], // R1: vertical, third column
        [0b0000, 0b0000, 0b1111, 0b0000], // R2: horizontal, third row
        [0b0100, 0b0100, 0b0100, 0b0100], // R3: vertical, second column
    ],
    // O: identical in all rotations
    [
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
    ],
    // T
    [
        [0b0100, 0b1110, 0b0000, 0b0000], // R0: pointing up
        [0b0100, 0b0110, 0b0100, 0b0000], // R1: pointing right
        [0b0000, 0b1110, 0b0100, 0b0000], // R2: pointing down
        [0b0100, 0b1100, 0b0100, 0b0000], // R3: pointing left
    ],
    // S
    [
        [0b0110, 0b1100, 0b0000, 0b0000],
        [0b0100, 0b0110, 0b0010, 0b0000],
        [0b0000, 0b0110, 0b1100, 0b0000],
        [0b1000, 0b1100, 0b0100, 0b0000],
    ],
    // Z
    [
        [0b1100, 0b0110, 0b0000, 0b0000],
        [0b0010, 0b0110, 0b0100, 0b0000],
        [0b0000, 0b1100, 0b0110, 0b0000],
        [0b0100, 0b1100, 0b1000, 0b0000],
    ],
    // J
    [
        [0b1000, 0b1110, 0b0000, 0b0000],
        [0b0110, 0b0100, 0b0100, 0b0000],
        [0b0000, 0b1110, 0b0010, 0b0000],
        [0b0100, 0b0100, 0b1100, 0b0000],
    ],
    // L
    [
        [0b0010, 0b1110, 0b0000, 0b0000],
        [0b0100, 0b0100, 0b0110, 0b0000],
        [0b0000, 0b1110, 0b1000, 0b0000],
        [0b1100, 0b0100, 0b0100, 0b0000],
    ],
];

// =============================================================================
// SRS KICK DATA
// =============================================================================

/// Wall kicks for J, L, S, T, Z. Indexed by the pre-rotation state; these
/// are the clockwise tables, counter-clockwise kicks are derived by negating
/// the target state's entries.
static JLSTZ_KICKS: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)], // R0 -> R1
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],     // R1 -> R2
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],    // R2 -> R3
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],  // R3 -> R0
];

/// Wall kicks for the I piece, which uses its own table.
static I_KICKS: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)], // R0 -> R1
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)], // R1 -> R2
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)], // R2 -> R3
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)], // R3 -> R0
];

/// Number of kick tests for a 180 rotation.
pub const KICK_180_COUNT: usize = 6;

/// 180-rotation kicks for J, L, S, T, Z, indexed by the pre-rotation state.
static JLSTZ_180_KICKS: [[(i32, i32); KICK_180_COUNT]; 4] = [
    [(0, 0), (0, 1), (1, 1), (-1, 1), (1, 0), (-1, 0)],    // R0 -> R2
    [(0, 0), (1, 0), (1, 2), (1, 1), (0, 2), (0, 1)],      // R1 -> R3
    [(0, 0), (0, -1), (-1, -1), (1, -1), (-1, 0), (1, 0)], // R2 -> R0
    [(0, 0), (-1, 0), (-1, 2), (-1, 1), (0, 2), (0, 1)],   // R3 -> R1
];

/// 180-rotation kicks for the I piece.
static I_180_KICKS: [[(i32, i32); KICK_180_COUNT]; 4] = [
    [(0, 0), (0, 1), (0, 2), (1, 0), (-1, 0), (1, 1)],     // R0 -> R2
    [(0, 0), (1, 0), (2, 0), (0, 1), (0, -1), (1, 1)],     // R1 -> R3
    [(0, 0), (0, -1), (0, -2), (-1, 0), (1, 0), (-1, -1)], // R2 -> R0
    [(0, 0), (-1, 0), (-2, 0), (0, 1), (0, -1), (-1, 1)],  // R3 -> R1
];

/// Shape rows for a kind in a given rotation state.
#[inline]
pub fn shape_rows(kind: PieceKind, rotation: Rotation) -> [u8; 4] {
    SHAPES[kind.index()][rotation.index()]
}

/// Kick offsets to try for an adjacent (90 degree) rotation.
///
/// Clockwise rotations read the table at the starting state; counter-clockwise
/// rotations negate the target state's clockwise entries. The O piece never
/// kicks, and a non-adjacent pair yields the zero offsets only.
pub fn wall_kicks(kind: PieceKind, from: Rotation, to: Rotation) -> [(i32, i32); 5] {
    let mut kicks = [(0, 0); 5];

    if kind == PieceKind::O {
        return kicks;
    }

    let table = if kind == PieceKind::I { &I_KICKS } else { &JLSTZ_KICKS };

    if from.cw() == to {
        kicks = table[from.index()];
    } else if from.ccw() == to {
        for (i, &(dx, dy)) in table[to.index()].iter().enumerate() {
            kicks[i] = (-dx, -dy);
        }
    }

    kicks
}

/// Kick offsets to try for a 180 rotation from the given state.
pub fn wall_kicks_180(kind: PieceKind, from: Rotation) -> [(i32, i32); KICK_180_COUNT] {
    if kind == PieceKind::O {
        return [(0, 0); KICK_180_COUNT];
    }

    let table = if kind == PieceKind::I {
        &I_180_KICKS
    } else {
        &JLSTZ_180_KICKS
    };
    table[from.index()]
}

// =============================================================================
// ACTIVE PIECE
// =============================================================================

/// A piece in play: kind, board position and rotation state.
///
/// The position anchors the top-left corner of the 4x4 shape box; a shape
/// cell at (row, col) occupies board cell `(x + col, y - row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    kind: PieceKind,
    x: i32,
    y: i32,
    rotation: Rotation,
}

impl Piece {
    /// Create a piece of the given kind at its spawn position.
    pub fn spawn(kind: PieceKind) -> Self {
        let (x, y) = kind.spawn_position();
        Self {
            kind,
            x,
            y,
            rotation: Rotation::R0,
        }
    }

    /// Kind of this piece.
    #[inline]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Box anchor x.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Box anchor y.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Current rotation state.
    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// The four board cells this piece occupies.
    pub fn cells(&self) -> [(i32, i32); 4] {
        let rows = shape_rows(self.kind, self.rotation);
        let mut out = [(0, 0); 4];
        let mut n = 0;
        for (r, row) in rows.iter().enumerate() {
            for c in 0..4 {
                if row & (1 << (3 - c)) != 0 && n < 4 {
                    out[n] = (self.x + c as i32, self.y - r as i32);
                    n += 1;
                }
            }
        }
        out
    }

    /// Attempt to move by (dx, dy); commits and returns true when the target
    /// cells are free.
    pub fn try_shift(&mut self, board: &Board, dx: i32, dy: i32) -> bool {
        let candidate = Piece {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        };
        if board.fits(&candidate) {
            *self = candidate;
            return true;
        }
        false
    }

    /// Attempt a clockwise rotation with wall kicks.
    pub fn try_rotate_cw(&mut self, board: &Board) -> bool {
        let to = self.rotation.cw();
        let kicks = wall_kicks(self.kind, self.rotation, to);
        self.try_kicks(board, to, &kicks)
    }

    /// Attempt a counter-clockwise rotation with wall kicks.
    pub fn try_rotate_ccw(&mut self, board: &Board) -> bool {
        let to = self.rotation.ccw();
        let kicks = wall_kicks(self.kind, self.rotation, to);
        self.try_kicks(board, to, &kicks)
    }

    /// Attempt a 180 rotation with its extended kick table.
    pub fn try_rotate_180(&mut self, board: &Board) -> bool {
        let to = self.rotation.half_turn();
        let kicks = wall_kicks_180(self.kind, self.rotation);
        self.try_kicks(board, to, &kicks)
    }

    fn try_kicks(&mut self, board: &Board, to: Rotation, kicks: &[(i32, i32)]) -> bool {
        for &(dx, dy) in kicks {
            let candidate = Piece {
                kind: self.kind,
                x: self.x + dx,
                y: self.y + dy,
                rotation: to,
            };
            if board.fits(&candidate) {
                *self = candidate;
                return true;
            }
        }
        false
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in PieceKind::ALL {
            for rotation in [Rotation::R0, Rotation::R1, Rotation::R2, Rotation::R3] {
                let total: u32 = shape_rows(kind, rotation)
                    .iter()
                    .map(|row| row.count_ones())
                    .sum();
                assert_eq!(total, 4, "{kind:?} {rotation:?}");
            }
        }
    }

    #[test]
    fn test_spawn_positions() {
        assert_eq!(PieceKind::I.spawn_position(), (3, 19));
        assert_eq!(PieceKind::O.spawn_position(), (3, 20));
        assert_eq!(PieceKind::T.spawn_position(), (3, 20));
    }

    #[test]
    fn test_rotation_cycle() {
        let mut r = Rotation::R0;
        for expected in [Rotation::R1, Rotation::R2, Rotation::R3, Rotation::R0] {
            r = r.cw();
            assert_eq!(r, expected);
        }
        assert_eq!(Rotation::R0.ccw(), Rotation::R3);
        assert_eq!(Rotation::R1.half_turn(), Rotation::R3);
    }

    #[test]
    fn test_t_spawn_cells() {
        // T at spawn: nub at (4, 20), bar across (3..=5, 19)
        let piece = Piece::spawn(PieceKind::T);
        let mut cells = piece.cells();
        cells.sort_unstable();
        assert_eq!(cells, [(3, 19), (4, 19), (4, 20), (5, 19)]);
    }

    #[test]
    fn test_i_spawn_cells_are_one_row() {
        let piece = Piece::spawn(PieceKind::I);
        let cells = piece.cells();
        assert!(cells.iter().all(|&(_, y)| y == 18));
        let xs: Vec<i32> = cells.iter().map(|&(x, _)| x).collect();
        assert_eq!(xs, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_cw_kicks_read_from_table() {
        let kicks = wall_kicks(PieceKind::T, Rotation::R0, Rotation::R1);
        assert_eq!(kicks, [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)]);

        let kicks = wall_kicks(PieceKind::I, Rotation::R2, Rotation::R3);
        assert_eq!(kicks, [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)]);
    }

    #[test]
    fn test_ccw_kicks_negate_target_table() {
        // R1 -> R0 negates the R0 -> R1 entries
        let cw = wall_kicks(PieceKind::T, Rotation::R0, Rotation::R1);
        let ccw = wall_kicks(PieceKind::T, Rotation::R1, Rotation::R0);
        for (c, n) in cw.iter().zip(ccw.iter()) {
            assert_eq!((-c.0, -c.1), *n);
        }
    }

    #[test]
    fn test_o_piece_never_kicks() {
        assert_eq!(
            wall_kicks(PieceKind::O, Rotation::R0, Rotation::R1),
            [(0, 0); 5]
        );
        assert_eq!(
            wall_kicks_180(PieceKind::O, Rotation::R0),
            [(0, 0); KICK_180_COUNT]
        );
    }

    #[test]
    fn test_non_adjacent_pair_yields_zero_offsets() {
        assert_eq!(
            wall_kicks(PieceKind::T, Rotation::R0, Rotation::R2),
            [(0, 0); 5]
        );
    }

    #[test]
    fn test_180_kicks_match_table() {
        assert_eq!(
            wall_kicks_180(PieceKind::J, Rotation::R1),
            [(0, 0), (1, 0), (1, 2), (1, 1), (0, 2), (0, 1)]
        );
        assert_eq!(
            wall_kicks_180(PieceKind::I, Rotation::R3),
            [(0, 0), (-1, 0), (-2, 0), (0, 1), (0, -1), (-1, 1)]
        );
    }

    #[test]
    fn test_shift_on_open_board() {
        let board = Board::new();
        let mut piece = Piece::spawn(PieceKind::L);
        assert!(piece.try_shift(&board, -1, 0));
        assert_eq!(piece.x(), 2);
        assert!(piece.try_shift(&board, 0, -1));
        assert_eq!(piece.y(), 19);
    }

    #[test]
    fn test_shift_blocked_by_wall() {
        let board = Board::new();
        let mut piece = Piece::spawn(PieceKind::O);
        // O occupies columns 4..=5 at spawn; 4 steps to the left hits the wall
        for _ in 0..4 {
            assert!(piece.try_shift(&board, -1, 0));
        }
        assert!(!piece.try_shift(&board, -1, 0));
        assert_eq!(piece.x(), -1); // box anchor; occupied columns are 0..=1
    }

    #[test]
    fn test_rotate_open_board_uses_first_kick() {
        let board = Board::new();
        let mut piece = Piece::spawn(PieceKind::T);
        assert!(piece.try_rotate_cw(&board));
        assert_eq!(piece.rotation(), Rotation::R1);
        // first kick is (0, 0): anchor unchanged
        assert_eq!((piece.x(), piece.y()), (3, 20));
    }
}
