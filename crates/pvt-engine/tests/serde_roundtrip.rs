//! Engine configuration serialization (serde feature only).
#![cfg(feature = "serde")]

use pvt_core::{Component, ComponentSet};
use pvt_engine::{EngineConfig, ViscosityConfig};
use pvt_eos::method::EosMethod;

#[test]
fn engine_config_round_trips_through_json() {
    let set = ComponentSet::new(vec![
        Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
        Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255).with_acentric(0.2002),
    ])
    .unwrap();
    let config = EngineConfig::cubic(set, EosMethod::PengRobinson)
        .with_viscosity(ViscosityConfig::jossi_default());

    let json = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}
