#![forbid(unsafe_code)]

pub mod codec;
pub mod deadline;
pub mod model;
pub mod time;
pub mod wire;

pub use time::Clock;
