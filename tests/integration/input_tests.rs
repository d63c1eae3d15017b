//! Input registration and debounce behaviour as seen through the model.

use std::sync::Arc;

use picomodel::adapters::{ManualClock, SimPin};
use picomodel::{
    Button, ModelConfig, ModelError, SoftwareTimer, StateModel,
};

use crate::mock_hw::{ButtonRig, RecordingController};

#[test]
fn contact_bounce_yields_one_press() {
    let mut rig = ButtonRig::new(2);
    rig.model.add_transition(0, &["button1_press"], 1).unwrap();
    rig.model.add_transition(1, &["button1_press"], 0).unwrap();
    rig.model.start();

    rig.clock.set(100);
    rig.set_pressed(true);
    rig.clock.set(110);
    rig.set_pressed(false);
    rig.clock.set(120);
    rig.set_pressed(true);
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(1));

    // Release then a bounce back down inside the window.
    rig.clock.set(300);
    rig.set_pressed(false);
    rig.clock.set(310);
    rig.set_pressed(true);
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(1));
    assert_eq!(rig.model.handler().entries(), [0, 1]);
}

#[test]
fn configured_debounce_applies_to_registered_inputs() {
    let config = ModelConfig::from_json(r#"{"debounce_ms": 200}"#).unwrap();
    let mut model = StateModel::new(1, RecordingController::new(), config).unwrap();
    let mut button = Button::button(SimPin::new(true), "button1").unwrap();
    assert_eq!(button.debounce_ms(), 50);

    model.add_input_source(&mut button).unwrap();
    assert_eq!(button.debounce_ms(), 200);
    assert!(button.has_handler());
}

#[test]
fn disarmed_input_posts_nothing() {
    let mut rig = ButtonRig::new(2);
    rig.model.add_transition(0, &["button1_press"], 1).unwrap();
    rig.model.start();

    rig.button.set_handler(None);
    rig.click();
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(0));
}

#[test]
fn source_names_are_unique_across_kinds() {
    let clock = ManualClock::new(0);
    let mut rig = ButtonRig::new(1);

    let dup_timer = SoftwareTimer::new("button1", Arc::new(clock)).unwrap();
    assert_eq!(
        rig.model.add_timer(dup_timer),
        Err(ModelError::DuplicateSource("button1".into()))
    );

    let mut again = Button::button(SimPin::new(true), "button1").unwrap();
    assert_eq!(
        rig.model.add_input_source(&mut again),
        Err(ModelError::DuplicateSource("button1".into()))
    );
    assert!(!again.has_handler());
}

#[test]
fn custom_events_cannot_shadow_source_events() {
    let mut rig = ButtonRig::new(1);
    assert_eq!(
        rig.model.add_custom_event("button1_press"),
        Err(ModelError::DuplicateEvent("button1_press".into()))
    );
    assert_eq!(
        rig.model.add_custom_event("NO_EVENT"),
        Err(ModelError::ReservedName)
    );
    assert!(matches!(
        rig.model.add_custom_event("two words"),
        Err(ModelError::InvalidName(_))
    ));
}

#[test]
fn invalid_source_name_is_rejected_at_construction() {
    assert!(matches!(
        Button::button(SimPin::new(true), ""),
        Err(ModelError::InvalidName(_))
    ));
    assert!(matches!(
        Button::button(SimPin::new(true), "a_name_that_is_far_too_long_for_storage"),
        Err(ModelError::InvalidName(_))
    ));
}

#[test]
fn registration_closed_while_running() {
    let mut rig = ButtonRig::new(2);
    rig.model.start();

    let mut late = Button::button(SimPin::new(true), "button2").unwrap();
    assert_eq!(
        rig.model.add_input_source(&mut late),
        Err(ModelError::AlreadyRunning)
    );
    assert_eq!(
        rig.model.add_transition(0, &["button1_press"], 1),
        Err(ModelError::AlreadyRunning)
    );
}
