mod optimize_pass;
mod optimizer;

pub use optimize_pass::*;
pub use optimizer::*;
