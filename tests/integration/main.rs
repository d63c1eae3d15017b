//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against simulated peripherals and a manual clock.  All tests run on the
//! host with no real hardware required.

mod input_tests;
mod mock_hw;
mod model_scenarios;
