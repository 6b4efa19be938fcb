pub mod vroom;

pub use vroom::{RouteOptimizer, UpstreamError, VroomClient};
