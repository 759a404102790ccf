//! Benchmark scenarios for the PVT engine.
//!
//! Each scenario evaluates a synthetic batch of objects, either on one
//! thread or with disjoint object ranges fanned out across rayon workers —
//! the engine itself stays single-threaded, the scheduler here plays the
//! role an external simulator would. Every worker owns its scratch.

use std::time::Instant;

use pvt_core::{Component, ComponentSet, DerivativeTier, HeatPolynomial};
use pvt_engine::{BatchInputs, EngineConfig, EvaluationRequest, PvtEngine, Scratch};
use pvt_eos::method::EosMethod;
use rayon::prelude::*;
use serde::Serialize;

/// One benchmark definition.
#[derive(Debug, Clone, Serialize)]
pub struct BenchScenario {
    pub name: String,
    pub objects: usize,
    pub tier: DerivativeTier,
    pub parallel: bool,
}

/// Timing results for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub scenario: BenchScenario,
    pub total_time_s: f64,
    pub objects_per_second: f64,
    /// Sum of compressibility factors; keeps the work from being optimized
    /// away and doubles as a determinism probe between runs.
    pub checksum: f64,
}

pub fn default_scenarios() -> Vec<BenchScenario> {
    let mut scenarios = Vec::new();
    for &(objects, parallel) in &[(10_000, false), (100_000, false), (100_000, true)] {
        for &tier in &[DerivativeTier::None, DerivativeTier::Temperature] {
            scenarios.push(BenchScenario {
                name: format!(
                    "{objects}-objects-{tier:?}{}",
                    if parallel { "-rayon" } else { "" }
                ),
                objects,
                tier,
                parallel,
            });
        }
    }
    scenarios
}

fn bench_engine() -> PvtEngine {
    let components = ComponentSet::new(vec![
        Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986)
            .with_acentric(0.0115)
            .with_parachor(77.0)
            .with_heat(HeatPolynomial {
                c: [1.2e3, 1.5, -2.0e-4, 1.0e-8, 0.0, 4.0e2],
            }),
        Component::new("C3", 44.096, 4.248e6, 369.89, 0.2).with_acentric(0.1523),
        Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255).with_acentric(0.2002),
        Component::new("nC10", 142.28, 2.103e6, 617.7, 0.6).with_acentric(0.4884),
    ])
    .expect("bench component set is valid");
    PvtEngine::new(EngineConfig::cubic(components, EosMethod::PengRobinson))
        .expect("bench engine builds")
}

/// Deterministic synthetic batch spanning gas and liquid conditions.
fn synthetic_batch(objects: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = 4;
    let mut pressure = Vec::with_capacity(objects);
    let mut temperature = Vec::with_capacity(objects);
    let mut composition = Vec::with_capacity(objects * n);
    for i in 0..objects {
        let f = (i % 97) as f64 / 96.0;
        pressure.push(1.0e6 + f * 4.0e7);
        temperature.push(280.0 + f * 220.0);
        let x0 = 0.35 + 0.55 * f;
        let rest = (1.0 - x0) / 3.0;
        composition.extend_from_slice(&[x0, rest, rest, rest]);
    }
    (pressure, temperature, composition)
}

pub fn run_scenario(scenario: &BenchScenario) -> BenchResult {
    let engine = bench_engine();
    engine.force_viscosity_tables();
    let (pressure, temperature, composition) = synthetic_batch(scenario.objects);
    let request = EvaluationRequest::full(scenario.tier);
    let n = 4;

    let start = Instant::now();
    let checksum = if scenario.parallel {
        // Disjoint object ranges, one scratch per worker.
        let chunk = 4096;
        (0..scenario.objects)
            .into_par_iter()
            .chunks(chunk)
            .map(|range| {
                let mut scratch = Scratch::with_capacity(range.len(), n);
                let (lo, hi) = (range[0], range[range.len() - 1] + 1);
                let inputs = BatchInputs {
                    pressure: &pressure[lo..hi],
                    temperature: &temperature[lo..hi],
                    composition: &composition[lo * n..hi * n],
                };
                let output = engine
                    .evaluate(inputs, request, &mut scratch)
                    .expect("bench batch shapes are consistent");
                output.cubic.z.iter().sum::<f64>()
            })
            .sum()
    } else {
        let mut scratch = Scratch::with_capacity(scenario.objects, n);
        let inputs = BatchInputs {
            pressure: &pressure,
            temperature: &temperature,
            composition: &composition,
        };
        let output = engine
            .evaluate(inputs, request, &mut scratch)
            .expect("bench batch shapes are consistent");
        output.cubic.z.iter().sum::<f64>()
    };
    let total_time_s = start.elapsed().as_secs_f64();

    BenchResult {
        scenario: scenario.clone(),
        total_time_s,
        objects_per_second: scenario.objects as f64 / total_time_s,
        checksum,
    }
}
