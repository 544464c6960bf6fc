pub mod error;
pub mod tape;
pub mod dialect;
pub mod basic;
pub mod extended;
pub mod search;
pub mod synth;
pub mod bench;
