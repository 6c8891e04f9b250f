//! Property-based round-trip tests.

use proptest::prelude::*;
use project_store::{
    downcast_state, fixed_path, same_state, AxisOrder, MemoryAttributeStore, Project, ProjectConfig,
    ProjectProperties, RawSourceState, SerializerRegistry, SourceState, SourceStates,
    ThresholdingSourceState,
};
use std::sync::Arc;

/// Blueprint of one state: a raw source, or a threshold over an earlier raw.
#[derive(Clone, Debug)]
enum Blueprint {
    Raw { color: String, min: f64, max: f64, axis_order: AxisOrder },
    Threshold { source_pick: usize, min: f64, max: f64, separate: bool },
}

/// Quarter steps are exact in binary and in short decimal form.
fn quarter() -> impl Strategy<Value = f64> {
    (0u32..4000).prop_map(|v| v as f64 / 4.0)
}

fn blueprint() -> impl Strategy<Value = Blueprint> {
    prop_oneof![
        (
            prop::sample::select(vec!["red", "green", "white", "#336699ff"]),
            quarter(),
            quarter(),
            prop::sample::select(vec![AxisOrder::XYZ, AxisOrder::ZYX, AxisOrder::YXZ]),
        )
            .prop_map(|(color, min, max, axis_order)| Blueprint::Raw {
                color: color.to_string(),
                min,
                max,
                axis_order,
            }),
        (any::<usize>(), quarter(), quarter(), any::<bool>()).prop_map(
            |(source_pick, min, max, separate)| Blueprint::Threshold {
                source_pick,
                min,
                max,
                separate,
            }
        ),
    ]
}

/// Materialize blueprints; thresholds with no earlier raw become raws.
fn build(blueprints: &[Blueprint], current_pick: Option<usize>) -> SourceStates {
    let mut states = SourceStates::new();
    let mut raws: Vec<Arc<RawSourceState>> = Vec::new();

    for (i, blueprint) in blueprints.iter().enumerate() {
        match blueprint {
            Blueprint::Threshold { source_pick, min, max, separate } if !raws.is_empty() => {
                let source = raws[source_pick % raws.len()].clone();
                let mut threshold = ThresholdingSourceState::new(format!("threshold{}", i), source);
                threshold.min = *min;
                threshold.max = *max;
                threshold.control_separately = *separate;
                states.add_state(Arc::new(threshold)).unwrap();
            }
            Blueprint::Raw { color, min, max, axis_order } => {
                let mut raw = RawSourceState::new(format!("raw{}", i));
                raw.color = color.clone();
                raw.min = *min;
                raw.max = *max;
                raw.axis_order = *axis_order;
                let raw = Arc::new(raw);
                raws.push(raw.clone());
                states.add_state(raw).unwrap();
            }
            Blueprint::Threshold { .. } => {
                let raw = Arc::new(RawSourceState::new(format!("raw{}", i)));
                raws.push(raw.clone());
                states.add_state(raw).unwrap();
            }
        }
    }

    if !states.is_empty() {
        let current = current_pick.map(|pick| pick % states.len());
        states.set_current_index(current).unwrap();
    }
    states
}

proptest! {
    #[test]
    fn prop_save_load_preserves_states(
        blueprints in prop::collection::vec(blueprint(), 0..24),
        current_pick in prop::option::of(any::<usize>()),
    ) {
        let states = build(&blueprints, current_pick);
        let project = Project::new(
            Box::new(MemoryAttributeStore::new()),
            SerializerRegistry::with_defaults(),
            fixed_path("/project"),
            ProjectConfig::default(),
        );

        project.save(&ProjectProperties::default(), &states).unwrap();
        let loaded = project.load().unwrap().states;

        prop_assert_eq!(loaded.len(), states.len());
        prop_assert_eq!(loaded.current_index(), states.current_index());

        for (index, (before, after)) in states.iter().zip(loaded.iter()).enumerate() {
            prop_assert_eq!(before.name(), after.name());

            if let Some(before) = downcast_state::<RawSourceState>(before) {
                let after = downcast_state::<RawSourceState>(after).unwrap();
                prop_assert_eq!(&*before, &*after);
            } else {
                let before = downcast_state::<ThresholdingSourceState>(before).unwrap();
                let after = downcast_state::<ThresholdingSourceState>(after).unwrap();
                prop_assert_eq!(&*before, &*after);

                // Reference points at the loaded object at the same position.
                let source_index = states.index_of(&before.source).unwrap();
                prop_assert!(source_index < index);
                prop_assert!(same_state(&after.source, loaded.get(source_index).unwrap()));
            }
        }
    }
}
