//! Input and timeout sources feeding the state model.

pub mod analog;
pub mod button;
pub mod timer;
