pub mod counts;
pub mod detection;
pub mod errors;
pub mod model;
pub mod postprocess;
pub mod signal;
pub mod stream;
