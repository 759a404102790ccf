//! Methane reference-fluid viscosity correlation.
//!
//! Dilute series plus first-density term plus an exponential excess, in
//! micropoise with T in kelvin and density in g/cm^3. The heavy-oil variant
//! carries a second excess term with its own constants, blended in by a
//! hyperbolic-tangent weight across the 50–75 K reference-temperature
//! window. All constant tables are private to this module.

/// Critical density of methane, g/cm^3.
const RHO_C: f64 = 0.1628;

/// Dilute-gas series coefficients for T^((n-4)/3), n = 1..9.
const GV: [f64; 9] = [
    -2.090975e5,
    2.647269e5,
    -1.472818e5,
    4.716740e4,
    -9.491872e3,
    1.219979e3,
    -9.627993e1,
    4.274152,
    -8.141531e-2,
];

// First-density coefficient: A + B (C - ln(T/F))^2.
const FD_A: f64 = 1.696_985_927;
const FD_B: f64 = -0.133_372_346;
const FD_C: f64 = 1.4;
const FD_F: f64 = 168.0;

/// Excess-term constants, standard fluid.
const J: [f64; 7] = [
    -10.350_605_86,
    17.571_599_671,
    -3_019.391_865_6,
    188.730_115_94,
    0.042_903_609_488,
    145.290_234_44,
    6_127.681_870_6,
];

/// Excess-term constants, heavy-oil extension.
const K: [f64; 7] = [
    -9.746_02,
    18.083_4,
    -4_126.66,
    44.605_5,
    0.976_544,
    81.813_4,
    15_649.9,
];

/// Centre and width of the tanh blend window (50-75 K).
const BLEND_MID: f64 = 62.5;
const BLEND_SCALE: f64 = 6.25;

/// Dilute-gas viscosity (microP) and its temperature derivative.
fn dilute(t: f64) -> (f64, f64) {
    let t13 = t.cbrt();
    let mut power = 1.0 / t; // T^(-3/3)
    let mut v = 0.0;
    let mut dv = 0.0;
    for (n, gv) in GV.iter().enumerate() {
        let exponent = (n as f64 - 3.0) / 3.0;
        v += gv * power;
        dv += gv * exponent * power / t;
        power *= t13;
    }
    (v, dv)
}

/// First-density coefficient (microP per g/cm^3) and its T derivative.
fn first_density(t: f64) -> (f64, f64) {
    let u = FD_C - (t / FD_F).ln();
    (FD_A + FD_B * u * u, -2.0 * FD_B * u / t)
}

/// Exponential excess term and its (T, rho) partials.
fn excess(t: f64, rho: f64, c: &[f64; 7]) -> (f64, f64, f64) {
    let theta = (rho - RHO_C) / RHO_C;
    let r01 = rho.powf(0.1);
    let r05 = rho.sqrt();
    let t15 = t * t.sqrt();

    let g1 = c[1] + c[2] / t15;
    let g2 = c[4] + c[5] / t + c[6] / (t * t);
    let inner = r01 * g1 + theta * r05 * g2;
    let e1 = (c[0] + c[3] / t).exp();
    let grown = inner.exp();
    let value = e1 * (grown - 1.0);

    let dinner_dt = r01 * (-1.5 * c[2] / (t15 * t)) + theta * r05 * (-c[5] / (t * t) - 2.0 * c[6] / (t * t * t));
    let dv_dt = value * (-c[3] / (t * t)) + e1 * grown * dinner_dt;

    let dinner_drho = 0.1 * r01 / rho * g1 + (r05 / RHO_C + theta * 0.5 / r05) * g2;
    let dv_drho = e1 * grown * dinner_drho;

    (value, dv_dt, dv_drho)
}

/// Methane viscosity (microP) with temperature and density partials, at
/// T [K] and rho [g/cm^3]. `heavy` carries the heavy-oil excess multiplier;
/// `None` leaves the standard single-excess form.
pub fn viscosity(t: f64, rho: f64, heavy: Option<f64>) -> (f64, f64, f64) {
    let (mu0, dmu0) = dilute(t);
    let (mu1, dmu1) = first_density(t);
    let (dj, dj_dt, dj_drho) = excess(t, rho, &J);

    let Some(scale) = heavy else {
        return (
            mu0 + mu1 * rho + dj,
            dmu0 + dmu1 * rho + dj_dt,
            mu1 + dj_drho,
        );
    };

    let (dk, dk_dt, dk_drho) = excess(t, rho, &K);
    let htan = ((t - BLEND_MID) / BLEND_SCALE).tanh();
    let f1 = 0.5 * (1.0 + htan);
    let f2 = 0.5 * (1.0 - htan) * scale;
    let dhtan = (1.0 - htan * htan) / BLEND_SCALE;

    let mu = mu0 + mu1 * rho + f1 * dj + f2 * dk;
    let dmu_dt =
        dmu0 + dmu1 * rho + f1 * dj_dt + f2 * dk_dt + 0.5 * dhtan * (dj - scale * dk);
    let dmu_drho = mu1 + f1 * dj_drho + f2 * dk_drho;
    (mu, dmu_dt, dmu_drho)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilute_methane_at_300k() {
        let (mu, _, _) = viscosity(300.0, 1.0e-6, None);
        // Roughly 11.2 microPa s = 112 microP at ambient conditions.
        assert!((105.0..120.0).contains(&mu), "mu = {mu}");
    }

    #[test]
    fn liquid_methane_at_100k() {
        // Saturated liquid methane is near 0.15 cP = 1500 microP.
        let (mu, _, _) = viscosity(100.0, 0.44, None);
        assert!((1000.0..2300.0).contains(&mu), "mu = {mu}");
    }

    #[test]
    fn partials_match_finite_differences() {
        let (t, rho) = (180.0, 0.25);
        let (_, dmu_dt, dmu_drho) = viscosity(t, rho, None);

        let dt = 1e-4;
        let fd_t = (viscosity(t + dt, rho, None).0 - viscosity(t - dt, rho, None).0) / (2.0 * dt);
        assert!((fd_t - dmu_dt).abs() < 1e-4 * dmu_dt.abs().max(1.0));

        let dr = 1e-7;
        let fd_r = (viscosity(t, rho + dr, None).0 - viscosity(t, rho - dr, None).0) / (2.0 * dr);
        assert!((fd_r - dmu_drho).abs() < 1e-4 * dmu_drho.abs().max(1.0));
    }

    #[test]
    fn heavy_extension_blends_across_window() {
        let rho = 0.3;
        // Far above the window the blend weight leaves the standard excess.
        let plain = viscosity(150.0, rho, None).0;
        let heavy = viscosity(150.0, rho, Some(1.0)).0;
        assert!((plain - heavy).abs() < 1e-3 * plain);
        // Inside the window the two variants differ.
        let plain_low = viscosity(60.0, rho, None).0;
        let heavy_low = viscosity(60.0, rho, Some(1.0)).0;
        assert!((plain_low - heavy_low).abs() > 1e-6 * plain_low.abs());
    }

    #[test]
    fn heavy_partials_match_finite_differences() {
        let (t, rho) = (62.0, 0.35);
        let (_, dmu_dt, dmu_drho) = viscosity(t, rho, Some(1.0));

        let dt = 1e-4;
        let fd_t = (viscosity(t + dt, rho, Some(1.0)).0 - viscosity(t - dt, rho, Some(1.0)).0) / (2.0 * dt);
        assert!((fd_t - dmu_dt).abs() < 1e-3 * dmu_dt.abs().max(1.0));

        let dr = 1e-7;
        let fd_r = (viscosity(t, rho + dr, Some(1.0)).0 - viscosity(t, rho - dr, Some(1.0)).0) / (2.0 * dr);
        assert!((fd_r - dmu_drho).abs() < 1e-3 * dmu_drho.abs().max(1.0));
    }
}
