//! Integration checks for the EOS pipeline: residuals, round trips,
//! idempotence, and agreement with independently coded Redlich-Kwong.

use pvt_core::{BatchState, Component, ComponentSet, DerivativeTier, HeatPolynomial, UnitSet};
use pvt_eos::{
    AssemblyRequest, CubicTuning, EosMethod, PvtCache, assemble, enthalpy, fugacity_coefficients,
    solve_batch, volume,
};

fn full_request() -> AssemblyRequest {
    AssemblyRequest {
        tier: DerivativeTier::Temperature,
        heat: true,
        fugacity: true,
    }
}

fn mix_set() -> ComponentSet {
    ComponentSet::new(vec![
        Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
        Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255).with_acentric(0.2002),
    ])
    .unwrap()
}

#[test]
fn cubic_residual_stays_below_1e9_across_sweep() {
    let cache = PvtCache::cubic(
        EosMethod::PengRobinson,
        mix_set(),
        UnitSet::si(),
        CubicTuning::default(),
        300.0,
    )
    .unwrap();
    let shape = *cache.shape();

    for &p in &[1.0e5, 1.0e6, 5.0e6, 2.0e7, 8.0e7] {
        for &t in &[150.0, 250.0, 350.0, 500.0] {
            for &x0 in &[0.1, 0.5, 0.9] {
                let ps = [p];
                let ts = [t];
                let xs = [x0, 1.0 - x0];
                let batch = BatchState::new(&ps, &ts, &xs, 2).unwrap();
                let terms = assemble(&cache, &batch, &[0], true, full_request());
                let sol = solve_batch(&shape, &terms, &batch, DerivativeTier::None, None);
                let z = sol.z[0];
                let (cs, ct, cu) = shape.cubic_coefficients(terms.a[0], terms.b[0]);
                let residual = ((z + cs) * z + ct) * z + cu;
                assert!(
                    residual.abs() < 1e-9,
                    "residual {residual:e} at P={p}, T={t}, x0={x0}"
                );
            }
        }
    }
}

#[test]
fn identical_inputs_give_bitwise_identical_outputs() {
    let cache = PvtCache::cubic(
        EosMethod::SoaveRedlichKwong,
        mix_set(),
        UnitSet::si(),
        CubicTuning::default(),
        300.0,
    )
    .unwrap();
    let ps = [4.0e6, 1.2e7];
    let ts = [300.0, 410.0];
    let xs = [0.4, 0.6, 0.8, 0.2];
    let batch = BatchState::new(&ps, &ts, &xs, 2).unwrap();
    let segs = [0usize, 0];

    let run = || {
        let terms = assemble(&cache, &batch, &segs, true, full_request());
        let sol = solve_batch(
            cache.shape(),
            &terms,
            &batch,
            DerivativeTier::Temperature,
            None,
        );
        let phi = fugacity_coefficients(
            &cache,
            &terms,
            &sol,
            &batch,
            &segs,
            DerivativeTier::Temperature,
        );
        let h = enthalpy(
            &cache,
            &terms,
            &sol,
            &batch,
            &segs,
            DerivativeTier::Temperature,
        );
        (sol.z, phi.value, h.h)
    };

    let (z1, phi1, h1) = run();
    let (z2, phi2, h2) = run();
    for (a, b) in z1.iter().zip(&z2) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    for (a, b) in phi1.iter().zip(&phi2) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    for (a, b) in h1.iter().zip(&h2) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn ideal_single_component_end_to_end() {
    let poly = HeatPolynomial {
        c: [1.9e3, 4.0, -6.0e-4, 4.0e-8, 0.0, 1.1e3],
    };
    let set = ComponentSet::new(vec![
        Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_heat(poly),
    ])
    .unwrap();
    let cache = PvtCache::ideal(set, UnitSet::si(), 300.0).unwrap();

    for &(p, t) in &[(1.0e5, 250.0), (5.0e6, 300.0), (9.0e7, 600.0)] {
        let ps = [p];
        let ts = [t];
        let xs = [1.0];
        let batch = BatchState::new(&ps, &ts, &xs, 1).unwrap();
        let terms = assemble(&cache, &batch, &[0], true, full_request());
        let sol = solve_batch(
            cache.shape(),
            &terms,
            &batch,
            DerivativeTier::Temperature,
            None,
        );
        // Z is exactly one at every pressure and temperature.
        assert_eq!(sol.z[0], 1.0);

        let phi = fugacity_coefficients(
            &cache,
            &terms,
            &sol,
            &batch,
            &[0],
            DerivativeTier::None,
        );
        assert_eq!(phi.value[0], 0.0);

        let h = enthalpy(&cache, &terms, &sol, &batch, &[0], DerivativeTier::None);
        let expected = poly.enthalpy(t).0;
        assert!((h.h[0] - expected).abs() < 1e-9 * expected.abs());

        // And the ideal-gas volume round trip holds exactly.
        let v = volume(&cache, &sol, &batch, &[0], DerivativeTier::None);
        let z_back = p * v.v[0] / (cache.gas_constant() * t);
        assert!((z_back - 1.0).abs() < 1e-14);
    }
}

/// Redlich-Kwong coded straight from the textbook closed form, no shared
/// machinery with the crate internals.
mod reference_rk {
    pub const OMEGA_B: f64 = 0.086_640_349_964_957_72; // (2^(1/3) - 1) / 3
    pub const OMEGA_A: f64 = 0.427_480_233_540_341; // 1 / (9 (2^(1/3) - 1))

    pub struct Mix {
        pub a: f64,
        pub b: f64,
        pub ai: Vec<f64>,
        pub bi: Vec<f64>,
    }

    pub fn mix(p: f64, t: f64, x: &[f64], tc: &[f64], pc: &[f64]) -> Mix {
        let n = x.len();
        let ai: Vec<f64> = (0..n)
            .map(|i| OMEGA_A * (p / pc[i]) / (t / tc[i]).powf(2.5))
            .collect();
        let bi: Vec<f64> = (0..n)
            .map(|i| OMEGA_B * (p / pc[i]) / (t / tc[i]))
            .collect();
        let sqrt_sum: f64 = (0..n).map(|i| x[i] * ai[i].sqrt()).sum();
        let a = sqrt_sum * sqrt_sum;
        let b: f64 = (0..n).map(|i| x[i] * bi[i]).sum();
        Mix { a, b, ai, bi }
    }

    pub fn z_factor(mix: &Mix) -> f64 {
        // Newton from the ideal-gas side on
        // Z^3 - Z^2 + (A - B - B^2) Z - A B = 0.
        let (a, b) = (mix.a, mix.b);
        let mut z: f64 = 1.0;
        for _ in 0..200 {
            let f = ((z - 1.0) * z + (a - b - b * b)) * z - a * b;
            let fp = (3.0 * z - 2.0) * z + a - b - b * b;
            let step = f / fp;
            z -= step;
            if step.abs() < 1e-14 {
                break;
            }
        }
        z
    }

    pub fn ln_phi(mix: &Mix, z: f64) -> Vec<f64> {
        let (a, b) = (mix.a, mix.b);
        let sqrt_a = a.sqrt();
        mix.ai
            .iter()
            .zip(&mix.bi)
            .map(|(ai, bi)| {
                let two_ai_over_a = 2.0 * ai.sqrt() / sqrt_a;
                bi / b * (z - 1.0)
                    - (z - b).ln()
                    - a / b * (two_ai_over_a - bi / b) * ((z + b) / z).ln()
            })
            .collect()
    }
}

#[test]
fn two_component_rk_matches_reference_formulas() {
    let cache = PvtCache::cubic(
        EosMethod::RedlichKwong,
        mix_set(),
        UnitSet::si(),
        CubicTuning::default(),
        300.0,
    )
    .unwrap();
    let tc = [190.56, 425.12];
    let pc = [4.599e6, 3.796e6];

    for &(p, t, x0) in &[
        (2.0e6, 350.0, 0.7),
        (5.0e6, 400.0, 0.5),
        (1.0e6, 450.0, 0.2),
    ] {
        let x = [x0, 1.0 - x0];
        let reference = reference_rk::mix(p, t, &x, &tc, &pc);
        let z_ref = reference_rk::z_factor(&reference);
        let phi_ref = reference_rk::ln_phi(&reference, z_ref);

        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, &x, 2).unwrap();
        let terms = assemble(&cache, &batch, &[0], true, full_request());
        let sol = solve_batch(cache.shape(), &terms, &batch, DerivativeTier::None, None);
        let phi = fugacity_coefficients(
            &cache,
            &terms,
            &sol,
            &batch,
            &[0],
            DerivativeTier::None,
        );

        assert!(
            (sol.z[0] - z_ref).abs() < 1e-4,
            "Z mismatch at P={p}, T={t}: {} vs {}",
            sol.z[0],
            z_ref
        );
        for i in 0..2 {
            assert!(
                (phi.value[i] - phi_ref[i]).abs() < 1e-4,
                "ln phi mismatch for component {i} at P={p}, T={t}"
            );
        }
    }
}

#[test]
fn rk_critical_point_recovers_one_third() {
    let set =
        ComponentSet::new(vec![Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986)]).unwrap();
    let cache = PvtCache::cubic(
        EosMethod::RedlichKwong,
        set,
        UnitSet::si(),
        CubicTuning::default(),
        300.0,
    )
    .unwrap();
    let ps = [4.599e6];
    let ts = [190.56];
    let xs = [1.0];
    let batch = BatchState::new(&ps, &ts, &xs, 1).unwrap();
    let terms = assemble(&cache, &batch, &[0], true, full_request());
    let sol = solve_batch(cache.shape(), &terms, &batch, DerivativeTier::None, None);
    // The RK critical compressibility is exactly 1/3.
    assert!(
        (sol.z[0] - 1.0 / 3.0).abs() < 1e-4,
        "Zc = {}",
        sol.z[0]
    );
}
