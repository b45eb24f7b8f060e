mod inline;

pub use inline::*;
