// rir-optimize: IR transformations
//
// - passes: focused passes implementing OptimizePass
// - utils: the pass interface and the driver that runs passes in order

pub mod error;
pub mod passes;
pub mod utils;

pub use passes::*;
pub use utils::*;
