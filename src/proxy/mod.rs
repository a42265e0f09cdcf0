pub mod balancer;
pub mod router;
pub mod target;

pub use balancer::LoadBalancer;
pub use router::Router;
