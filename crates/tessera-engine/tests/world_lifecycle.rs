//! Integration test: single-task world lifecycle.
//!
//! Covers hook ordering, step counting, the default environment update,
//! serialization cadence, births, deaths and early finalization.

use std::sync::{Arc, Mutex};

use tessera_agents::Agent;
use tessera_core::{AgentError, AgentId, Point2D, RasterError, Size2D, StepId};
use tessera_engine::{
    ActionContext, ConfigError, EnvironmentContext, MemorySerializer, Scenario, SimulationConfig,
    World, WorldError, WorldSetup, WorldState,
};
use tessera_test_utils::{Motion, TestScenario};

fn config(size: u32, num_steps: u64) -> SimulationConfig {
    SimulationConfig {
        size: Size2D::new(size, size),
        num_steps,
        ..SimulationConfig::default()
    }
}

// ── Scenario that records hook calls ────────────────────────────────

#[derive(Default)]
struct Recording {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl Recording {
    fn push(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Scenario for Recording {
    fn create_rasters(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        self.push("rasters");
        setup.register_dynamic_raster("grass", false, None)?;
        setup.rasters().set_init_values("grass", 0, 100, 0)?;
        Ok(())
    }

    fn create_agents(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        self.push("agents");
        assert!(setup.rasters().is_sealed());
        match setup.register_static_raster("late", false, None) {
            Err(WorldError::Raster(RasterError::Immutable { .. })) => {}
            other => panic!("expected Immutable, got {other:?}"),
        }
        Ok(())
    }

    fn step_environment(&mut self, env: &mut EnvironmentContext<'_>) -> Result<(), WorldError> {
        self.push("environment");
        for raster in env.dynamic_rasters() {
            env.grow(raster, 1)?;
        }
        Ok(())
    }
}

#[test]
fn hooks_run_once_in_order() {
    let scenario = Recording::default();
    let calls = Arc::clone(&scenario.calls);
    let mut world = World::new(config(4, 3), Box::new(scenario)).unwrap();

    world.initialize().unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["rasters", "agents"]);
    assert_eq!(world.state(), WorldState::Initialized);

    let final_step = world.run().unwrap();
    assert_eq!(final_step, StepId(3));
    assert_eq!(world.current_step(), StepId(3));
    assert_eq!(world.state(), WorldState::Finalized);
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["rasters", "agents", "environment", "environment", "environment"]
    );
    assert_eq!(world.rasters().get_value("grass", &Point2D::new(3, 3)).unwrap(), 3);
}

#[test]
fn lifecycle_is_enforced() {
    let mut world = World::new(config(4, 1), TestScenario::new().boxed()).unwrap();
    match world.run() {
        Err(WorldError::Lifecycle {
            operation: "run",
            state: WorldState::Uninitialized,
        }) => {}
        other => panic!("expected Lifecycle, got {other:?}"),
    }
    world.initialize().unwrap();
    match world.initialize() {
        Err(WorldError::Lifecycle { .. }) => {}
        other => panic!("expected Lifecycle, got {other:?}"),
    }
    world.run().unwrap();
    match world.run() {
        Err(WorldError::Lifecycle {
            state: WorldState::Finalized,
            ..
        }) => {}
        other => panic!("expected Lifecycle, got {other:?}"),
    }
}

#[test]
fn single_task_constructor_rejects_partitioned_config() {
    let cfg = SimulationConfig {
        num_tasks: 2,
        ..config(8, 1)
    };
    match World::new(cfg, TestScenario::new().boxed()) {
        Err(WorldError::Config(ConfigError::TaskMismatch { num_tasks: 2, .. })) => {}
        other => panic!("expected TaskMismatch, got {other:?}"),
    }
}

#[test]
fn default_environment_grows_to_bound() {
    let cfg = SimulationConfig {
        growth_step: 2,
        ..config(6, 4)
    };
    let scenario = TestScenario::new()
        .dynamic_raster("grass", 0, 5, 0)
        .static_raster("rock", 7);
    let mut world = World::new(cfg, scenario.boxed()).unwrap();
    world.initialize().unwrap();
    world.run().unwrap();

    let p = Point2D::new(2, 4);
    assert_eq!(world.rasters().get_value("grass", &p).unwrap(), 5);
    assert_eq!(world.rasters().get_value("rock", &p).unwrap(), 7);
    assert_eq!(world.raster_count(), 2);
}

#[test]
fn serialization_cadence_includes_last_step() {
    let cfg = SimulationConfig {
        serialize_every: 4,
        ..config(6, 10)
    };
    let scenario = TestScenario::new()
        .dynamic_raster("grass", 0, 100, 0)
        .static_raster("rock", 1)
        .agent("a", "sheep", Point2D::new(1, 1));
    let recorder = MemorySerializer::new();
    let mut world = World::new(cfg, scenario.boxed())
        .unwrap()
        .with_serializer(Box::new(recorder.clone()));
    world.initialize().unwrap();
    world.run().unwrap();

    let run = recorder.recorded();
    assert_eq!(run.agent_steps(), vec![0, 4, 8, 9]);
    assert_eq!(run.final_step, Some(10));

    let grass: Vec<(u64, i32)> = run
        .raster_history("grass")
        .into_iter()
        .map(|(step, snap)| (step, snap.get(&Point2D::new(0, 0)).unwrap()))
        .collect();
    assert_eq!(grass, vec![(0, 1), (4, 5), (8, 9), (9, 10)]);

    let rock = run.raster_history("rock");
    assert_eq!(rock.len(), 1);
    assert_eq!(rock[0].0, 0);

    let header = run.header.expect("header written");
    assert_eq!(header.num_steps, 10);
    assert_eq!(header.rasters.len(), 2);
}

// ── Births and deaths ────────────────────────────────────────────────

struct Nursery;

impl Scenario for Nursery {
    fn create_rasters(&mut self, _setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        Ok(())
    }

    fn create_agents(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        setup.add_agent(Agent::new("parent", "parent", Point2D::new(1, 1)))?;
        setup.add_agent(Agent::new("mayfly", "mayfly", Point2D::new(5, 5)))?;
        setup.register_behavior(
            "parent",
            Box::new(
                |id: &AgentId, ctx: &mut ActionContext<'_>| -> Result<(), WorldError> {
                    if ctx.step() == StepId(0) {
                        let pos = ctx.agent(id)?.position();
                        ctx.spawn(Agent::new("child", "child", pos.offset(1, 0)))?;
                    }
                    Ok(())
                },
            ),
        );
        setup.register_behavior(
            "child",
            Box::new(
                |id: &AgentId, ctx: &mut ActionContext<'_>| -> Result<(), WorldError> {
                    let agent = ctx.agent_mut(id)?;
                    let acts = agent.int_attribute("acts").unwrap_or(0);
                    agent.set_attribute("acts", acts + 1);
                    Ok(())
                },
            ),
        );
        setup.register_behavior(
            "mayfly",
            Box::new(
                |id: &AgentId, ctx: &mut ActionContext<'_>| -> Result<(), WorldError> {
                    if ctx.step() == StepId(1) {
                        ctx.kill(id)?;
                    }
                    Ok(())
                },
            ),
        );
        Ok(())
    }
}

#[test]
fn newborns_act_from_the_next_step() {
    let mut world = World::new(config(8, 3), Box::new(Nursery)).unwrap();
    world.initialize().unwrap();
    world.run().unwrap();

    let child = world.agent(&AgentId::new("child")).unwrap();
    assert_eq!(child.position(), Point2D::new(2, 1));
    assert_eq!(child.int_attribute("acts"), Some(2));
}

#[test]
fn killed_agents_are_purged_at_end_of_step() {
    let mut world = World::new(config(8, 2), Box::new(Nursery)).unwrap();
    world.initialize().unwrap();
    world.run().unwrap();

    match world.agent(&AgentId::new("mayfly")) {
        Err(WorldError::Agent(AgentError::NotFound { .. })) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(world.last_metrics().purged, 1);
    assert_eq!(world.last_metrics().step, 1);
    assert!(world.check_position(&Point2D::new(5, 5)));
}

// ── Finalization ─────────────────────────────────────────────────────

#[test]
fn finalize_stops_after_current_step() {
    let cfg = SimulationConfig {
        serialize_every: 4,
        ..config(6, 10)
    };
    let scenario = TestScenario::new()
        .agent("stopper", "stopper", Point2D::new(0, 0))
        .motion("stopper", Motion::FinalizeAt { step: 3 });
    let recorder = MemorySerializer::new();
    let mut world = World::new(cfg, scenario.boxed())
        .unwrap()
        .with_serializer(Box::new(recorder.clone()));
    world.initialize().unwrap();

    assert_eq!(world.run().unwrap(), StepId(4));
    let run = recorder.recorded();
    assert_eq!(run.agent_steps(), vec![0, 3]);
    assert_eq!(run.final_step, Some(4));
}

#[test]
fn finalize_before_run_executes_nothing() {
    let mut world = World::new(config(4, 10), TestScenario::new().boxed()).unwrap();
    world.set_finalize(true);
    world.initialize().unwrap();
    assert_eq!(world.run().unwrap(), StepId(0));
}

// ── Placement and determinism ────────────────────────────────────────

#[test]
fn saturated_region_reports_capacity() {
    let full = TestScenario::new().scatter("sheep", 4);
    let mut world = World::new(config(2, 1), full.boxed()).unwrap();
    world.initialize().unwrap();
    assert_eq!(world.agents().owned_count(), 4);
    match world.random_position() {
        Err(WorldError::Capacity { .. }) => {}
        other => panic!("expected Capacity, got {other:?}"),
    }

    let overfull = TestScenario::new().scatter("sheep", 5);
    let mut world = World::new(config(2, 1), overfull.boxed()).unwrap();
    match world.initialize() {
        Err(WorldError::Capacity { .. }) => {}
        other => panic!("expected Capacity, got {other:?}"),
    }
}

#[test]
fn same_seed_same_trajectory() {
    let run = |seed: u64| {
        let cfg = SimulationConfig {
            seed,
            ..config(16, 20)
        };
        let scenario = TestScenario::new()
            .scatter("walker", 10)
            .motion("walker", Motion::RandomWalk);
        let mut world = World::new(cfg, scenario.boxed()).unwrap();
        world.initialize().unwrap();
        world.run().unwrap();
        world.agents().snapshot_owned()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn world_queries_match_registry() {
    let scenario = TestScenario::new()
        .agent("a", "sheep", Point2D::new(0, 0))
        .agent("b", "wolf", Point2D::new(1, 0))
        .agent("c", "sheep", Point2D::new(3, 3));
    let mut world = World::new(config(8, 1), scenario.boxed()).unwrap();
    world.initialize().unwrap();

    let a = AgentId::new("a");
    assert_eq!(world.count_neighbours(&a, 1.0, "all").unwrap(), 1);
    assert_eq!(world.count_neighbours(&a, 5.0, "sheep").unwrap(), 1);
    assert_eq!(world.neighbours(&a, 5.0, "wolf").unwrap()[0].id().as_str(), "b");
    assert_eq!(world.agents_at(&Point2D::new(3, 3), "all").len(), 1);
    assert!(!world.check_position(&Point2D::new(1, 0)));
    assert!(!world.check_position(&Point2D::new(8, 0)));

    world.remove_agent(&AgentId::new("b")).unwrap();
    assert!(world.check_position(&Point2D::new(1, 0)));
}
