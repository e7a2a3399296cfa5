//! Declarative test scenario.

use tessera_agents::{Agent, AttrKind};
use tessera_core::Point2D;
use tessera_engine::{AgentBehavior, Scenario, WorldError, WorldSetup};

use crate::behaviors::{Drift, FailAt, FinalizeAt, Harvest, RandomWalker, Stationary};

/// A raster to register and fill.
#[derive(Clone, Debug)]
pub struct RasterSpec {
    pub name: String,
    pub dynamic: bool,
    pub serialize: bool,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

/// Behaviour attached to an agent type.
#[derive(Clone, Debug)]
pub enum Motion {
    Stationary,
    Drift { dx: i32, dy: i32 },
    RandomWalk,
    Harvest { raster: String },
    FinalizeAt { step: u64 },
    FailAt { step: u64 },
}

impl Motion {
    fn behavior(&self) -> Box<dyn AgentBehavior> {
        match self {
            Motion::Stationary => Box::new(Stationary),
            Motion::Drift { dx, dy } => Box::new(Drift { dx: *dx, dy: *dy }),
            Motion::RandomWalk => Box::new(RandomWalker),
            Motion::Harvest { raster } => Box::new(Harvest {
                raster: raster.clone(),
            }),
            Motion::FinalizeAt { step } => Box::new(FinalizeAt { step: *step }),
            Motion::FailAt { step } => Box::new(FailAt { step: *step }),
        }
    }
}

/// Scenario assembled from a list of rasters, agents and behaviours.
///
/// Placed agents are given in global coordinates; a task creates those
/// inside its owned region. Scattered agents are created by every task at
/// random free cells of its owned region, with ids `{kind}-{task}-{i}`.
#[derive(Clone, Debug, Default)]
pub struct TestScenario {
    rasters: Vec<RasterSpec>,
    placed: Vec<Agent>,
    scattered: Vec<(String, usize)>,
    motions: Vec<(String, Motion)>,
    attributes: Vec<(String, String, AttrKind)>,
}

impl TestScenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raster(mut self, spec: RasterSpec) -> Self {
        self.rasters.push(spec);
        self
    }

    /// Serialized dynamic raster with bounds `[min, max]`.
    pub fn dynamic_raster(self, name: &str, min: i32, max: i32, default: i32) -> Self {
        self.raster(RasterSpec {
            name: name.to_string(),
            dynamic: true,
            serialize: true,
            min,
            max,
            default,
        })
    }

    /// Serialized static raster filled with `default`.
    pub fn static_raster(self, name: &str, default: i32) -> Self {
        self.raster(RasterSpec {
            name: name.to_string(),
            dynamic: false,
            serialize: true,
            min: i32::MIN,
            max: i32::MAX,
            default,
        })
    }

    pub fn agent(mut self, id: &str, kind: &str, position: Point2D) -> Self {
        self.placed.push(Agent::new(id, kind, position));
        self
    }

    pub fn placed_agent(mut self, agent: Agent) -> Self {
        self.placed.push(agent);
        self
    }

    pub fn scatter(mut self, kind: &str, per_task: usize) -> Self {
        self.scattered.push((kind.to_string(), per_task));
        self
    }

    pub fn motion(mut self, kind: &str, motion: Motion) -> Self {
        self.motions.push((kind.to_string(), motion));
        self
    }

    pub fn attribute(mut self, kind: &str, key: &str, attr: AttrKind) -> Self {
        self.attributes
            .push((kind.to_string(), key.to_string(), attr));
        self
    }

    pub fn boxed(self) -> Box<dyn Scenario> {
        Box::new(self)
    }
}

impl Scenario for TestScenario {
    fn create_rasters(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        for spec in &self.rasters {
            if spec.dynamic {
                setup.register_dynamic_raster(&spec.name, spec.serialize, None)?;
            } else {
                setup.register_static_raster(&spec.name, spec.serialize, None)?;
            }
            setup
                .rasters()
                .set_init_values(spec.name.as_str(), spec.min, spec.max, spec.default)?;
        }
        Ok(())
    }

    fn create_agents(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
        let owned = setup.owned_region();
        for agent in &self.placed {
            if owned.contains(&agent.position()) {
                setup.add_agent(agent.clone())?;
            }
        }
        let task = setup.task_id();
        for (kind, count) in &self.scattered {
            for i in 0..*count {
                let position = setup.random_position()?;
                setup.add_agent(Agent::new(format!("{kind}-{task}-{i}"), kind.as_str(), position))?;
            }
        }
        for (kind, motion) in &self.motions {
            setup.register_behavior(kind.as_str(), motion.behavior());
        }
        for (kind, key, attr) in &self.attributes {
            setup.declare_attribute(kind, key, *attr);
        }
        Ok(())
    }
}
