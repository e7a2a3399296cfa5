//! Rectangular partition of the global domain into per-task sections.

use smallvec::SmallVec;
use tessera_core::{Point2D, Rect, Size2D, TaskId};

use crate::direction::Direction;
use crate::error::SpaceError;

/// One task's share of the domain.
///
/// `owned` is exclusive: across a layout the owned rectangles tile the
/// domain exactly once. `boundaries` is `owned` grown by the overlap width
/// and clipped to the domain; the cells in `boundaries` but not in `owned`
/// form this task's overlap band (ghost cells refreshed from neighbours).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    task: TaskId,
    column: u32,
    row: u32,
    owned: Rect,
    boundaries: Rect,
}

impl Section {
    /// Owning task.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Exclusive region.
    pub fn owned(&self) -> Rect {
        self.owned
    }

    /// Exclusive region plus overlap band.
    pub fn boundaries(&self) -> Rect {
        self.boundaries
    }

    /// `(column, row)` of this section in the task grid.
    pub fn grid_position(&self) -> (u32, u32) {
        (self.column, self.row)
    }

    /// `true` if `p` is a ghost cell of this section.
    pub fn in_overlap_band(&self, p: &Point2D) -> bool {
        self.boundaries.contains(p) && !self.owned.contains(p)
    }
}

/// Grid partition of a rectangular domain among `columns * rows` tasks.
///
/// Task ids are assigned row-major: `TaskId(row * columns + column)`.
/// Section spans differ by at most one cell per axis; the first sections
/// along an axis absorb the remainder.
///
/// # Examples
///
/// ```
/// use tessera_core::{Point2D, Size2D, TaskId};
/// use tessera_space::PartitionLayout;
///
/// let layout = PartitionLayout::new(Size2D::new(10, 10), 4, 1).unwrap();
/// assert_eq!(layout.grid_shape(), (2, 2));
/// assert_eq!(layout.owner_of(&Point2D::new(7, 2)), Some(TaskId(1)));
/// assert_eq!(layout.neighbours(TaskId(0)).len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct PartitionLayout {
    domain: Size2D,
    overlap: u32,
    columns: u32,
    rows: u32,
    column_starts: Vec<i32>,
    row_starts: Vec<i32>,
    sections: Vec<Section>,
}

impl PartitionLayout {
    /// Largest accepted domain dimension. Leaves headroom so that
    /// `boundaries` arithmetic cannot overflow `i32`.
    pub const MAX_DIM: u32 = (i32::MAX / 4) as u32;

    /// Split `domain` among `num_tasks` tasks with an overlap band of
    /// `overlap` cells.
    ///
    /// The task grid is the factorisation of `num_tasks` whose sections are
    /// closest to square (ties prefer more columns). Fails if the domain is
    /// empty, no factorisation leaves every section at least one cell, or
    /// the overlap is wider than the narrowest section along a split axis.
    pub fn new(domain: Size2D, num_tasks: u32, overlap: u32) -> Result<Self, SpaceError> {
        if domain.is_empty() {
            return Err(SpaceError::EmptyDomain);
        }
        if num_tasks == 0 {
            return Err(SpaceError::NoTasks);
        }
        for (name, value) in [("width", domain.width), ("height", domain.height)] {
            if value > Self::MAX_DIM {
                return Err(SpaceError::DimensionTooLarge {
                    name,
                    value,
                    max: Self::MAX_DIM,
                });
            }
        }

        let (columns, rows) =
            choose_grid(domain, num_tasks).ok_or(SpaceError::TooManyTasks {
                tasks: num_tasks,
                domain,
            })?;
        let column_starts = split_axis(domain.width, columns);
        let row_starts = split_axis(domain.height, rows);

        let narrowest = narrowest_span(&column_starts, &row_starts);
        if let Some(narrowest) = narrowest {
            if overlap > narrowest {
                return Err(SpaceError::OverlapTooWide { overlap, narrowest });
            }
        }

        let domain_rect = Rect::from_size(domain);
        let mut sections = Vec::with_capacity(num_tasks as usize);
        for row in 0..rows {
            for column in 0..columns {
                let min = Point2D::new(
                    column_starts[column as usize],
                    row_starts[row as usize],
                );
                let max = Point2D::new(
                    column_starts[column as usize + 1],
                    row_starts[row as usize + 1],
                );
                // split_axis never yields an empty span because columns <= width.
                let owned = Rect::from_corners(min, max).ok_or(SpaceError::TooManyTasks {
                    tasks: num_tasks,
                    domain,
                })?;
                let boundaries = owned
                    .expand(overlap)
                    .intersection(&domain_rect)
                    .unwrap_or(owned);
                sections.push(Section {
                    task: TaskId(row * columns + column),
                    column,
                    row,
                    owned,
                    boundaries,
                });
            }
        }

        Ok(Self {
            domain,
            overlap,
            columns,
            rows,
            column_starts,
            row_starts,
            sections,
        })
    }

    /// A one-task layout: the single section owns the whole domain.
    pub fn single(domain: Size2D) -> Result<Self, SpaceError> {
        Self::new(domain, 1, 0)
    }

    /// Global domain size.
    pub fn domain(&self) -> Size2D {
        self.domain
    }

    /// Global domain as a rectangle anchored at the origin.
    pub fn domain_rect(&self) -> Rect {
        Rect::from_size(self.domain)
    }

    /// Overlap band width.
    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    /// Number of tasks.
    pub fn num_tasks(&self) -> u32 {
        self.columns * self.rows
    }

    /// `(columns, rows)` of the task grid.
    pub fn grid_shape(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// All sections, indexed by task id.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section of `task`, if it exists.
    pub fn section(&self, task: TaskId) -> Option<&Section> {
        self.sections.get(task.index())
    }

    /// Task whose exclusive region contains `p`, or `None` outside the domain.
    pub fn owner_of(&self, p: &Point2D) -> Option<TaskId> {
        if !self.domain_rect().contains(p) {
            return None;
        }
        let column = self.column_starts.partition_point(|&s| s <= p.x) - 1;
        let row = self.row_starts.partition_point(|&s| s <= p.y) - 1;
        Some(TaskId(row as u32 * self.columns + column as u32))
    }

    /// Grid-adjacent tasks of `task`, in [`Direction::EXCHANGE_ORDER`].
    ///
    /// Returns an empty list for an unknown task.
    pub fn neighbours(&self, task: TaskId) -> SmallVec<[(Direction, TaskId); 8]> {
        let mut out = SmallVec::new();
        let Some(section) = self.section(task) else {
            return out;
        };
        let (column, row) = section.grid_position();
        for direction in Direction::EXCHANGE_ORDER {
            let (dc, dr) = direction.offset();
            let c = column as i64 + dc as i64;
            let r = row as i64 + dr as i64;
            if c < 0 || r < 0 || c >= self.columns as i64 || r >= self.rows as i64 {
                continue;
            }
            out.push((direction, TaskId(r as u32 * self.columns + c as u32)));
        }
        out
    }

    /// Cells `from` owns that `to` replicates in its overlap band.
    ///
    /// This is what `from` ships to `to` each step. `None` when the two
    /// sections do not share a band (not adjacent, or zero overlap).
    pub fn band(&self, from: TaskId, to: TaskId) -> Option<Rect> {
        if from == to {
            return None;
        }
        let a = self.section(from)?;
        let b = self.section(to)?;
        a.owned().intersection(&b.boundaries())
    }
}

/// Section start offsets along one axis, plus the axis length as a sentinel.
fn split_axis(len: u32, parts: u32) -> Vec<i32> {
    let base = len / parts;
    let remainder = len % parts;
    let mut starts = Vec::with_capacity(parts as usize + 1);
    let mut cursor = 0i32;
    starts.push(cursor);
    for i in 0..parts {
        let span = base + u32::from(i < remainder);
        cursor += span as i32;
        starts.push(cursor);
    }
    starts
}

/// Narrowest span along every axis that is actually split.
fn narrowest_span(column_starts: &[i32], row_starts: &[i32]) -> Option<u32> {
    let spans = |starts: &[i32]| -> Vec<u32> {
        if starts.len() <= 2 {
            return Vec::new();
        }
        starts.windows(2).map(|w| (w[1] - w[0]) as u32).collect()
    };
    spans(column_starts)
        .into_iter()
        .chain(spans(row_starts))
        .min()
}

/// Pick the `(columns, rows)` factorisation with the squarest sections.
fn choose_grid(domain: Size2D, num_tasks: u32) -> Option<(u32, u32)> {
    let mut best: Option<((u32, u32), f64)> = None;
    for columns in 1..=num_tasks {
        if num_tasks % columns != 0 {
            continue;
        }
        let rows = num_tasks / columns;
        if columns > domain.width || rows > domain.height {
            continue;
        }
        let w = f64::from(domain.width) / f64::from(columns);
        let h = f64::from(domain.height) / f64::from(rows);
        let score = (w - h).abs();
        match best {
            Some((_, s)) if score > s => {}
            _ => best = Some(((columns, rows), score)),
        }
    }
    best.map(|(shape, _)| shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use proptest::prelude::*;

    fn p(x: i32, y: i32) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn single_task_owns_everything() {
        let layout = PartitionLayout::single(Size2D::new(8, 5)).unwrap();
        assert_eq!(layout.num_tasks(), 1);
        let s = layout.section(TaskId(0)).unwrap();
        assert_eq!(s.owned(), Rect::from_size(Size2D::new(8, 5)));
        assert_eq!(s.boundaries(), s.owned());
        assert!(layout.neighbours(TaskId(0)).is_empty());
    }

    #[test]
    fn four_tasks_on_square_domain_form_two_by_two() {
        let layout = PartitionLayout::new(Size2D::new(10, 10), 4, 2).unwrap();
        assert_eq!(layout.grid_shape(), (2, 2));
        let s0 = layout.section(TaskId(0)).unwrap();
        assert_eq!(s0.owned(), Rect::new(p(0, 0), Size2D::new(5, 5)));
        assert_eq!(s0.boundaries(), Rect::new(p(0, 0), Size2D::new(7, 7)));
        let s3 = layout.section(TaskId(3)).unwrap();
        assert_eq!(s3.boundaries(), Rect::new(p(3, 3), Size2D::new(7, 7)));
    }

    #[test]
    fn two_tasks_split_into_columns() {
        let layout = PartitionLayout::new(Size2D::new(10, 10), 2, 1).unwrap();
        assert_eq!(layout.grid_shape(), (2, 1));
        assert_eq!(layout.owner_of(&p(4, 9)), Some(TaskId(0)));
        assert_eq!(layout.owner_of(&p(5, 0)), Some(TaskId(1)));
    }

    #[test]
    fn remainder_goes_to_leading_sections() {
        let layout = PartitionLayout::new(Size2D::new(7, 1), 3, 0).unwrap();
        let widths: Vec<u32> = layout
            .sections()
            .iter()
            .map(|s| s.owned().size.width)
            .collect();
        assert_eq!(widths, vec![3, 2, 2]);
    }

    #[test]
    fn owner_of_outside_domain_is_none() {
        let layout = PartitionLayout::new(Size2D::new(10, 10), 4, 1).unwrap();
        assert_eq!(layout.owner_of(&p(-1, 0)), None);
        assert_eq!(layout.owner_of(&p(0, 10)), None);
    }

    #[test]
    fn neighbours_follow_exchange_order() {
        let layout = PartitionLayout::new(Size2D::new(9, 9), 9, 1).unwrap();
        let centre: Vec<Direction> = layout
            .neighbours(TaskId(4))
            .iter()
            .map(|&(d, _)| d)
            .collect();
        assert_eq!(centre, Direction::EXCHANGE_ORDER.to_vec());
        let corner: Vec<(Direction, TaskId)> = layout.neighbours(TaskId(0)).into_vec();
        assert_eq!(
            corner,
            vec![
                (Direction::South, TaskId(3)),
                (Direction::East, TaskId(1)),
                (Direction::SouthEast, TaskId(4)),
            ]
        );
    }

    #[test]
    fn band_is_owned_by_sender_and_ghosted_by_receiver() {
        let layout = PartitionLayout::new(Size2D::new(10, 10), 2, 2).unwrap();
        let band = layout.band(TaskId(0), TaskId(1)).unwrap();
        assert_eq!(band, Rect::new(p(3, 0), Size2D::new(2, 10)));
        assert_eq!(layout.band(TaskId(0), TaskId(0)), None);
    }

    #[test]
    fn zero_overlap_has_no_bands() {
        let layout = PartitionLayout::new(Size2D::new(10, 10), 4, 0).unwrap();
        assert_eq!(layout.band(TaskId(0), TaskId(1)), None);
        assert_eq!(layout.band(TaskId(0), TaskId(3)), None);
    }

    #[test]
    fn rejects_empty_domain_and_zero_tasks() {
        assert_eq!(
            PartitionLayout::new(Size2D::new(0, 4), 1, 0).unwrap_err(),
            SpaceError::EmptyDomain
        );
        assert_eq!(
            PartitionLayout::new(Size2D::new(4, 4), 0, 0).unwrap_err(),
            SpaceError::NoTasks
        );
    }

    #[test]
    fn rejects_more_tasks_than_fit() {
        assert!(matches!(
            PartitionLayout::new(Size2D::new(2, 1), 3, 0),
            Err(SpaceError::TooManyTasks { tasks: 3, .. })
        ));
    }

    #[test]
    fn rejects_overlap_wider_than_section() {
        assert_eq!(
            PartitionLayout::new(Size2D::new(6, 6), 3, 3).unwrap_err(),
            SpaceError::OverlapTooWide {
                overlap: 3,
                narrowest: 2
            }
        );
        // One task never has neighbours, so any overlap is fine.
        assert!(PartitionLayout::new(Size2D::new(2, 2), 1, 5).is_ok());
    }

    #[test]
    fn compliance_reference_layouts() {
        for (w, h, tasks, overlap) in [(10, 10, 4, 1), (17, 5, 3, 2), (32, 32, 16, 2), (5, 40, 8, 1)] {
            let layout = PartitionLayout::new(Size2D::new(w, h), tasks, overlap).unwrap();
            compliance::run_full_compliance(&layout);
        }
    }

    proptest! {
        #[test]
        fn any_valid_layout_is_compliant(
            w in 1u32..40,
            h in 1u32..40,
            tasks in 1u32..13,
            overlap in 0u32..4,
        ) {
            if let Ok(layout) = PartitionLayout::new(Size2D::new(w, h), tasks, overlap) {
                prop_assert_eq!(layout.num_tasks(), tasks);
                compliance::run_full_compliance(&layout);
            }
        }
    }
}
