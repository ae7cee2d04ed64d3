//! # NetReach Core
//!
//! Core types, traits and I/O for the NetReach network-accessibility library.
//!
//! This crate provides:
//! - `Feature` / `FeatureCollection`: vector feature model over `geo-types`
//! - `Feedback`: progress and cancellation channel
//! - Algorithm trait for consistent API
//! - Layer I/O: GeoJSON in, GeoPackage containers out

pub mod error;
pub mod feedback;
pub mod io;
pub mod vector;

pub use error::{Error, Result};
pub use feedback::{Feedback, NullFeedback};
pub use vector::{AttributeValue, BoundingBox, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::feedback::{Feedback, NullFeedback};
    pub use crate::vector::{AttributeValue, BoundingBox, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in NetReach.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
