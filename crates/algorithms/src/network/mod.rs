//! Network accessibility algorithms
//!
//! - Graph construction from line layers (tolerance snapping, per-feature
//!   direction and speed)
//! - Multi-source shortest-cost search with a cutoff
//! - Service area extraction (reachable sub-network, boundary points)

mod dijkstra;
mod graph;
mod service_area;

pub use dijkstra::shortest_costs;
pub use graph::{CostStrategy, Direction, GraphParams, NetworkGraph, Segment};
pub use service_area::{
    service_area, NetworkProvider, ServiceArea, ServiceAreaInput, ServiceAreaOutput,
    ServiceAreaParams, ServiceAreaProvider,
};
