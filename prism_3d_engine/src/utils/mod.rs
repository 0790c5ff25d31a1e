/// Utility module

pub mod frame_timer;

pub use frame_timer::*;
