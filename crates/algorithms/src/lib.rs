//! # NetReach Algorithms
//!
//! Network accessibility analysis for NetReach.
//!
//! ## Available Algorithm Categories
//!
//! - **network**: graph construction, shortest-cost search, service areas
//! - **batch**: multi-cutoff service area driver writing GeoPackage containers

pub mod batch;
pub mod network;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{
        distance_classes, multi_service_area, MultiServiceAreaOutput, MultiServiceAreaParams,
        CONTAINER_FILE,
    };
    pub use crate::network::{
        service_area, CostStrategy, Direction, NetworkGraph, NetworkProvider, ServiceArea,
        ServiceAreaOutput, ServiceAreaParams, ServiceAreaProvider,
    };
    pub use netreach_core::prelude::*;
}
