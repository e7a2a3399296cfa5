//! Position validity and free-cell sampling shared by the world and its
//! hook contexts.

use tessera_agents::AgentRegistry;
use tessera_core::{Point2D, Rect};

use crate::error::WorldError;
use crate::random::RandomSource;

/// Rejection-sampling attempts before falling back to enumeration.
const SAMPLE_ATTEMPTS: usize = 32;

/// `true` iff `p` lies in `domain` and, unless `allow_multiple` is set, no
/// live agent (owned or ghost) stands on it.
pub(crate) fn check_position(
    domain: &Rect,
    agents: &AgentRegistry,
    allow_multiple: bool,
    p: &Point2D,
) -> bool {
    domain.contains(p) && (allow_multiple || !agents.is_occupied(p))
}

/// Uniformly chosen free cell of `region`.
///
/// Tries a few uniform samples first, then picks uniformly among the
/// enumerated free cells. Fails with [`WorldError::Capacity`] when the
/// region is saturated.
pub(crate) fn random_position(
    region: &Rect,
    domain: &Rect,
    agents: &AgentRegistry,
    allow_multiple: bool,
    rng: &mut dyn RandomSource,
) -> Result<Point2D, WorldError> {
    if region.is_empty() {
        return Err(WorldError::Capacity { region: *region });
    }
    for _ in 0..SAMPLE_ATTEMPTS {
        let p = Point2D::new(
            rng.uniform(region.origin.x, region.right() - 1),
            rng.uniform(region.origin.y, region.bottom() - 1),
        );
        if check_position(domain, agents, allow_multiple, &p) {
            return Ok(p);
        }
    }
    let free: Vec<Point2D> = region
        .iter()
        .filter(|p| check_position(domain, agents, allow_multiple, p))
        .collect();
    if free.is_empty() {
        return Err(WorldError::Capacity { region: *region });
    }
    let pick = rng.uniform(0, free.len() as i32 - 1) as usize;
    Ok(free[pick])
}
