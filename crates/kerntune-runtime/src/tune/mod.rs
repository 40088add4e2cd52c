mod searcher;
mod stop_condition;

pub use searcher::*;
pub use stop_condition::*;
