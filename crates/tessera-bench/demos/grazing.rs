//! Four-task grazing run.
//!
//! Demonstrates: config -> task group -> per-task memory serializers ->
//! read back grass totals and the final population per task.

use tessera_bench::{grazing_scenario, reference_config};
use tessera_engine::{MemorySerializer, Serializer, TaskGroup};

fn main() {
    println!("=== Tessera grazing example ===\n");

    let config = reference_config(4, 42);
    let recorders: Vec<MemorySerializer> = (0..config.num_tasks)
        .map(|_| MemorySerializer::new())
        .collect();
    let group = TaskGroup::new(config).unwrap();

    let reports = group
        .run(
            |_| grazing_scenario(50).boxed(),
            |task| Box::new(recorders[task.index()].clone()) as Box<dyn Serializer>,
        )
        .unwrap();

    for report in &reports {
        println!(
            "task {}: {} sheep after {} steps, last step {:>6}μs (sync {:>5}μs), wall {:?}",
            report.task,
            report.agents.len(),
            report.final_step,
            report.metrics.total_us,
            report.metrics.sync_us,
            report.wall_time,
        );
    }

    println!("\nGrass per serialized step:");
    let runs: Vec<_> = recorders.iter().map(MemorySerializer::recorded).collect();
    let steps = runs[0].agent_steps();
    for step in steps {
        let total: i64 = runs
            .iter()
            .flat_map(|run| run.raster_history("grass"))
            .filter(|(s, _)| *s == step)
            .map(|(_, snap)| snap.total())
            .sum();
        println!("  step {step:>3}: grass={total}");
    }
}
