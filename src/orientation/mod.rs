// Orientation normalisation: pure axis remapping followed by per-target smoothing.
pub mod mapper;
pub mod smoother;
