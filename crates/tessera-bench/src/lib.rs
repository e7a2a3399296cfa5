//! Benchmark profiles for the Tessera simulation engine.
//!
//! - [`reference_config`]: 128x128 domain, 50 steps, any task count
//! - [`grazing_scenario`]: regrowing grass plus harvesting random walkers
//! - [`agent_positions`]: deterministic distinct cells for registry benches

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashSet;

use tessera_core::{Point2D, Size2D};
use tessera_engine::SimulationConfig;
use tessera_test_utils::{Motion, TestScenario};

/// Side length of the reference domain.
pub const REFERENCE_SIDE: u32 = 128;

/// Build the reference benchmark configuration.
pub fn reference_config(num_tasks: u32, seed: u64) -> SimulationConfig {
    SimulationConfig {
        size: Size2D::new(REFERENCE_SIDE, REFERENCE_SIDE),
        num_steps: 50,
        serialize_every: 10,
        overlap: 1,
        num_tasks,
        seed,
        ..SimulationConfig::default()
    }
}

/// Grass that regrows up to 10 and `walkers_per_task` harvesting walkers
/// per task.
pub fn grazing_scenario(walkers_per_task: usize) -> TestScenario {
    TestScenario::new()
        .dynamic_raster("grass", 0, 10, 10)
        .scatter("sheep", walkers_per_task)
        .motion(
            "sheep",
            Motion::Harvest {
                raster: "grass".to_string(),
            },
        )
}

/// `n` distinct cells of a `side`x`side` grid, deterministic in `seed`.
/// Capped at the number of cells.
pub fn agent_positions(side: u32, n: usize, seed: u64) -> Vec<Point2D> {
    let cells = u64::from(side) * u64::from(side);
    let n = n.min(cells as usize);
    let mut taken = HashSet::with_capacity(n);
    let mut out = Vec::with_capacity(n);
    for i in 0..n as u64 {
        let mut idx = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(i.wrapping_mul(1442695040888963407))
            % cells;
        // Linear probe past collisions.
        while !taken.insert(idx) {
            idx = (idx + 1) % cells;
        }
        out.push(Point2D::new((idx % u64::from(side)) as i32, (idx / u64::from(side)) as i32));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_validates() {
        reference_config(1, 42).validate().unwrap();
        reference_config(4, 42).validate().unwrap();
    }

    #[test]
    fn agent_positions_are_distinct_and_in_range() {
        let positions = agent_positions(10, 50, 3);
        assert_eq!(positions.len(), 50);
        let unique: HashSet<_> = positions.iter().copied().collect();
        assert_eq!(unique.len(), 50);
        assert!(positions
            .iter()
            .all(|p| (0..10).contains(&p.x) && (0..10).contains(&p.y)));
    }

    #[test]
    fn agent_positions_deterministic() {
        assert_eq!(agent_positions(32, 20, 9), agent_positions(32, 20, 9));
    }
}
