//! Standalone benchmark runner for the PVT engine.

use pvt_bench::{BenchResult, default_scenarios, run_scenario};
use serde::Serialize;

#[derive(Serialize)]
struct BenchmarkSuite {
    results: Vec<BenchResult>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    println!("PVT Engine Benchmark Suite");
    println!("==========================\n");

    let scenarios = default_scenarios();
    println!("Running {} scenarios...\n", scenarios.len());

    let mut results = Vec::new();
    for (idx, scenario) in scenarios.iter().enumerate() {
        print!("[{}/{}] {} ... ", idx + 1, scenarios.len(), scenario.name);
        std::io::Write::flush(&mut std::io::stdout())?;
        let result = run_scenario(scenario);
        println!(
            "OK ({:.3}s, {:.0} objects/s)",
            result.total_time_s, result.objects_per_second
        );
        results.push(result);
    }

    println!("\n==========================");
    println!("Summary");
    println!("==========================\n");
    for result in &results {
        println!(
            "{:<40} {:>9.4}s {:>12.0} obj/s",
            result.scenario.name, result.total_time_s, result.objects_per_second
        );
    }

    let json = serde_json::to_string_pretty(&BenchmarkSuite { results })?;
    std::fs::write("pvt-bench-baseline.json", json)?;
    println!("\nWrote pvt-bench-baseline.json");
    Ok(())
}
