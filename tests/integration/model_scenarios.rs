//! End-to-end scenarios: inputs and timers → event queue → state model.
//!
//! Time is driven by a `ManualClock` and the loop by explicit `step()`
//! calls, except where a test exercises `run()` itself.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use picomodel::adapters::{ManualClock, SimAnalog, SimPin, ThreadAlarm};
use picomodel::ports::Clock;
use picomodel::{
    AnalogSensor, DigitalSensor, HardwareTimer, ModelConfig, ModelError, SoftwareTimer,
    StateModel,
};

use crate::mock_hw::{entered, left, ButtonRig, Call, RecordingController};

fn plain_model(num_states: usize) -> StateModel<RecordingController> {
    StateModel::new(num_states, RecordingController::new(), ModelConfig::default()).unwrap()
}

// ── Button + timer controller ─────────────────────────────────

#[test]
fn button_starts_timer_and_timeout_returns_to_idle() {
    let mut rig = ButtonRig::new(2);
    let timer = rig
        .model
        .add_timer(SoftwareTimer::new("timer1", Arc::new(rig.clock.clone())).unwrap())
        .unwrap();
    rig.model.handler_mut().timer_on_entry = Some((1, timer, 5.0));
    rig.model.add_transition(0, &["button1_press"], 1).unwrap();
    rig.model.add_transition(1, &["timer1_timeout"], 0).unwrap();
    rig.model.start();

    rig.click();
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(1));
    assert!(rig.model.timer_running(timer));
    // The release has no transition from state 1 and is offered in-state.
    assert!(rig.model.handler().calls.contains(&Call::Event {
        state: 1,
        event: "button1_release".into(),
    }));

    rig.clock.advance(4_999);
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(1));

    rig.clock.advance(1);
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(0));
    assert_eq!(
        rig.model.handler().transitions(),
        [
            entered(0, "NO_EVENT"),
            left(0, "button1_press"),
            entered(1, "button1_press"),
            left(1, "timer1_timeout"),
            entered(0, "timer1_timeout"),
        ]
    );
}

#[test]
fn entry_failure_does_not_block_later_transitions() {
    let mut rig = ButtonRig::new(2);
    rig.model.handler_mut().failing.push(1);
    rig.model.add_transition(0, &["button1_press"], 1).unwrap();
    rig.model.add_transition(1, &["button1_release"], 0).unwrap();
    rig.model.start();

    rig.click();
    rig.model.step();
    assert_eq!(rig.model.current_state(), Some(0));
    assert_eq!(rig.model.handler().entries(), [0, 1, 0]);
}

// ── Sensors ───────────────────────────────────────────────────

#[test]
fn either_sensor_trips_the_same_transition() {
    let clock = ManualClock::new(0);
    let a_pin = SimPin::new(false);
    let b_pin = SimPin::new(false);
    let mut a = DigitalSensor::digital_sensor(a_pin.clone(), "sensorA", false).unwrap();
    let mut b = DigitalSensor::digital_sensor(b_pin.clone(), "sensorB", false).unwrap();

    let mut model = plain_model(2);
    model.add_input_source(&mut a).unwrap();
    model.add_input_source(&mut b).unwrap();
    model
        .add_transition(0, &["sensorA_trip", "sensorB_trip"], 1)
        .unwrap();
    model
        .add_transition(1, &["sensorA_untrip", "sensorB_untrip"], 0)
        .unwrap();
    model.start();

    clock.advance(100);
    b_pin.set_high();
    b.on_edge(clock.now_ms());
    model.step();
    assert_eq!(model.current_state(), Some(1));
    // The callbacks see the event that fired, not the whole list.
    assert_eq!(
        model.handler().transitions(),
        [
            entered(0, "NO_EVENT"),
            left(0, "sensorB_trip"),
            entered(1, "sensorB_trip"),
        ]
    );
    model.handler_mut().take();

    clock.advance(100);
    b_pin.set_low();
    b.on_edge(clock.now_ms());
    model.step();
    assert_eq!(model.current_state(), Some(0));

    clock.advance(100);
    a_pin.set_high();
    a.on_edge(clock.now_ms());
    model.step();
    assert_eq!(model.current_state(), Some(1));
    assert_eq!(
        model.handler().transitions(),
        [
            left(1, "sensorB_untrip"),
            entered(0, "sensorB_untrip"),
            left(0, "sensorA_trip"),
            entered(1, "sensorA_trip"),
        ]
    );
}

#[test]
fn polled_analog_sensor_drives_transitions() {
    let adc = SimAnalog::new(60_000);
    let mut model = plain_model(2);
    model
        .add_polled_sensor(AnalogSensor::new(adc.clone(), "ldr", 20_000, true).unwrap())
        .unwrap();
    model.add_transition(0, &["ldr_trip"], 1).unwrap();
    model.add_transition(1, &["ldr_untrip"], 0).unwrap();
    model.start();

    model.step();
    assert_eq!(model.current_state(), Some(0));

    adc.set(100);
    model.step();
    assert_eq!(model.current_state(), Some(1));
    model.step();
    assert_eq!(model.current_state(), Some(1));

    adc.set(50_000);
    model.step();
    assert_eq!(model.current_state(), Some(0));
}

// ── Unmapped and in-state events ──────────────────────────────

#[test]
fn unhandled_event_is_dropped() {
    let mut model = plain_model(2);
    model.add_custom_event("noise").unwrap();
    model.start();

    model.post_event("noise").unwrap();
    model.step();
    assert_eq!(model.current_state(), Some(0));
    assert!(model.handler().calls.contains(&Call::Event {
        state: 0,
        event: "noise".into(),
    }));
}

#[test]
fn in_state_handler_can_stop_the_model() {
    let mut model = plain_model(2);
    model.add_custom_event("shutdown").unwrap();
    model.handler_mut().stop_event = Some("shutdown");
    model.start();

    model.post_event("shutdown").unwrap();
    model.step();
    assert!(!model.is_running());
    assert_eq!(model.current_index(), -1);
    assert_eq!(
        model.handler().calls.last(),
        Some(&Call::Left {
            state: 0,
            event: "NO_EVENT".into(),
        })
    );
}

#[test]
fn events_from_another_thread_are_processed() {
    let mut model = plain_model(2);
    let remote = model.add_custom_event("remote").unwrap();
    model.add_transition(0, &["remote"], 1).unwrap();
    model.start();

    let sender = model.sender();
    thread::spawn(move || assert!(sender.post(remote)))
        .join()
        .unwrap();
    model.step();
    assert_eq!(model.current_state(), Some(1));
}

#[test]
fn full_queue_reports_dropped_event() {
    let mut model = plain_model(1);
    model.add_custom_event("tick").unwrap();
    model.start();

    for _ in 0..picomodel::events::EVENT_QUEUE_CAP {
        model.post_event("tick").unwrap();
    }
    assert_eq!(
        model.post_event("tick"),
        Err(ModelError::QueueFull("tick".into()))
    );

    model.step();
    assert!(model.post_event("tick").is_ok());
}

// ── Control loop ──────────────────────────────────────────────

#[test]
fn run_returns_once_a_callback_stops() {
    let mut model = plain_model(1);
    model.handler_mut().stop_after_do = Some(3);

    model.run(Duration::ZERO);
    assert!(!model.is_running());
    assert_eq!(model.handler().do_count(), 3);
}

#[test]
fn step_order_is_do_then_epsilon() {
    let mut model = plain_model(2);
    model.handler_mut().record_do = true;
    model.add_transition(0, &["NO_EVENT"], 1).unwrap();
    model.start();
    model.handler_mut().take();

    model.step();
    assert_eq!(
        model.handler_mut().take(),
        [
            Call::Do { state: 0 },
            Call::Left {
                state: 0,
                event: "NO_EVENT".into(),
            },
            Call::Entered {
                state: 1,
                event: "NO_EVENT".into(),
            },
        ]
    );
}

#[test]
fn hardware_timer_expiry_reaches_the_loop() {
    let mut model = plain_model(2);
    let timer = model
        .add_timer(HardwareTimer::new("alarm", ThreadAlarm::new()).unwrap())
        .unwrap();
    model.handler_mut().timer_on_entry = Some((0, timer, 0.05));
    model.handler_mut().stop_on_entry = Some(1);
    model.add_transition(0, &["alarm_timeout"], 1).unwrap();

    model.run(Duration::from_millis(5));
    assert_eq!(model.handler().entries(), [0, 1]);
}

#[test]
fn stop_cancels_timers_and_restart_is_clean() {
    let clock = ManualClock::new(0);
    let mut model = plain_model(2);
    let timer = model
        .add_timer(SoftwareTimer::new("timer1", Arc::new(clock.clone())).unwrap())
        .unwrap();
    model.handler_mut().timer_on_entry = Some((0, timer, 1.0));
    model.add_transition(0, &["timer1_timeout"], 1).unwrap();

    model.start();
    assert!(model.timer_running(timer));
    model.stop();
    assert!(!model.timer_running(timer));

    // Restart re-arms the timer from the current time, not the old deadline.
    clock.advance(5_000);
    model.start();
    model.step();
    assert_eq!(model.current_state(), Some(0));

    clock.advance(1_000);
    model.step();
    assert_eq!(model.current_state(), Some(1));
}
