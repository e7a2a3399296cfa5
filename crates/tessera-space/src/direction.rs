//! Compass directions between adjacent sections.

/// Relative position of a neighbouring section in the task grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Row above.
    North,
    /// Row below.
    South,
    /// Column to the left.
    West,
    /// Column to the right.
    East,
    /// Above and to the left.
    NorthWest,
    /// Above and to the right.
    NorthEast,
    /// Below and to the left.
    SouthWest,
    /// Below and to the right.
    SouthEast,
}

impl Direction {
    /// Fixed protocol order: north before south, west before east, edges
    /// before corners. Every task walks its neighbours in this order, so
    /// all tasks agree on the sequence of exchanges.
    pub const EXCHANGE_ORDER: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// `(column, row)` step in the task grid.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::NorthEast => (1, -1),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    /// The direction pointing back.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::NorthWest => Direction::SouthEast,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }

    /// `true` for the four diagonal neighbours.
    pub fn is_corner(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }
}
