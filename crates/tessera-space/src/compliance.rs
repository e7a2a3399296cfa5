//! Layout invariant checks.
//!
//! These functions verify that a [`PartitionLayout`] satisfies the
//! ownership and adjacency contract the scheduler relies on. Reused by the
//! unit tests and the layout proptests.

use crate::partition::PartitionLayout;
use tessera_core::{Point2D, TaskId};

/// Assert that every domain cell is owned by exactly one section, and that
/// `owner_of` names that section.
pub fn assert_owned_regions_tile_domain(layout: &PartitionLayout) {
    let domain = layout.domain_rect();
    let mut owners = vec![0u32; domain.area()];
    for section in layout.sections() {
        for p in section.owned().iter() {
            let idx = domain
                .local_index(&p)
                .unwrap_or_else(|| panic!("{} owns {p} outside the domain", section.task()));
            owners[idx] += 1;
            assert_eq!(
                layout.owner_of(&p),
                Some(section.task()),
                "owner_of({p}) disagrees with section {}",
                section.task()
            );
        }
    }
    for (idx, count) in owners.iter().enumerate() {
        assert_eq!(
            *count,
            1,
            "cell {:?} owned {count} times",
            domain.point_at(idx)
        );
    }
}

/// Assert that `boundaries` contains `owned` and stays inside the domain.
pub fn assert_boundaries_contain_owned(layout: &PartitionLayout) {
    let domain = layout.domain_rect();
    for section in layout.sections() {
        assert!(
            section.boundaries().contains_rect(&section.owned()),
            "{}: boundaries {} do not contain owned {}",
            section.task(),
            section.boundaries(),
            section.owned()
        );
        assert!(
            domain.contains_rect(&section.boundaries()),
            "{}: boundaries {} leave the domain",
            section.task(),
            section.boundaries()
        );
    }
}

/// Assert that `b` is a neighbour of `a` in direction `d` exactly when `a`
/// is a neighbour of `b` in direction `d.opposite()`.
pub fn assert_neighbours_symmetric(layout: &PartitionLayout) {
    for section in layout.sections() {
        let a = section.task();
        for (direction, b) in layout.neighbours(a) {
            let back = layout.neighbours(b);
            assert!(
                back.contains(&(direction.opposite(), a)),
                "{a} sees {b} to the {direction:?} but {b} does not see {a} back"
            );
        }
    }
}

/// Assert that each band is owned by the sender and falls in the receiver's
/// overlap band.
pub fn assert_bands_are_ghost_cells(layout: &PartitionLayout) {
    for section in layout.sections() {
        let from = section.task();
        for (_, to) in layout.neighbours(from) {
            let Some(band) = layout.band(from, to) else {
                continue;
            };
            let Some(receiver) = layout.section(to) else {
                panic!("neighbour {to} of {from} has no section");
            };
            for p in band.iter() {
                assert!(section.owned().contains(&p), "{p} in band {from}->{to} not owned by {from}");
                assert!(
                    receiver.in_overlap_band(&p),
                    "{p} in band {from}->{to} is not a ghost cell of {to}"
                );
            }
        }
    }
}

/// Assert that every ghost cell of a section is owned by one of its
/// neighbours, so that one exchange round refreshes the whole band.
pub fn assert_ghost_cells_owned_by_neighbours(layout: &PartitionLayout) {
    for section in layout.sections() {
        let task = section.task();
        let neighbours: Vec<TaskId> = layout.neighbours(task).iter().map(|&(_, t)| t).collect();
        let ghosts = section
            .boundaries()
            .iter()
            .filter(|p: &Point2D| section.in_overlap_band(p));
        for p in ghosts {
            let owner = layout.owner_of(&p);
            assert!(
                owner.is_some_and(|o| neighbours.contains(&o)),
                "ghost cell {p} of {task} owned by {owner:?}, not a neighbour"
            );
        }
    }
}

/// Run all compliance checks.
pub fn run_full_compliance(layout: &PartitionLayout) {
    assert_owned_regions_tile_domain(layout);
    assert_boundaries_contain_owned(layout);
    assert_neighbours_symmetric(layout);
    assert_bands_are_ghost_cells(layout);
    assert_ghost_cells_owned_by_neighbours(layout);
}
