pub use self::args::{Args, DESCRIPTION};

pub mod coerce;

mod args;
