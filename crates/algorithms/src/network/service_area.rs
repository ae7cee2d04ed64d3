//! Service area extraction
//!
//! Computes the part of a network reachable from a set of start points
//! within a travel-cost cutoff. Segments whose both ends are within the
//! cutoff are emitted whole; segments crossing the cutoff are cut at the
//! interpolated crossing point. Optionally also emits the boundary
//! vertices (lower bound: last vertices inside the cutoff, upper bound:
//! first vertices beyond it).

use super::dijkstra::shortest_costs;
use super::graph::{CostStrategy, Direction, GraphParams, NetworkGraph};
use geo::{Euclidean, Length};
use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Point};
use netreach_core::{Algorithm, AttributeValue, Error, Feature, FeatureCollection, Result};
use tracing::{debug, info};

/// Parameters for service area extraction
#[derive(Debug, Clone)]
pub struct ServiceAreaParams {
    /// Cost measure
    pub strategy: CostStrategy,
    /// Travel-cost cutoff (layer units for shortest, seconds for fastest)
    pub travel_cost: f64,
    /// Attribute holding the per-feature direction value
    pub direction_field: Option<String>,
    pub value_forward: String,
    pub value_backward: String,
    pub value_both: String,
    /// Direction when the field is absent or unmatched
    pub default_direction: Direction,
    /// Attribute holding the per-feature speed (km/h)
    pub speed_field: Option<String>,
    /// Speed fallback (km/h)
    pub default_speed: f64,
    /// Vertex snapping tolerance (layer units)
    pub tolerance: f64,
    /// Also emit upper/lower boundary points
    pub include_bounds: bool,
}

impl Default for ServiceAreaParams {
    fn default() -> Self {
        Self {
            strategy: CostStrategy::Shortest,
            travel_cost: 0.0,
            direction_field: None,
            value_forward: String::new(),
            value_backward: String::new(),
            value_both: String::new(),
            default_direction: Direction::Both,
            speed_field: None,
            default_speed: 5.0,
            tolerance: 5.0,
            include_bounds: false,
        }
    }
}

impl ServiceAreaParams {
    fn graph_params(&self) -> GraphParams {
        GraphParams {
            tolerance: self.tolerance,
            direction_field: self.direction_field.clone(),
            value_forward: self.value_forward.clone(),
            value_backward: self.value_backward.clone(),
            value_both: self.value_both.clone(),
            default_direction: self.default_direction,
            speed_field: self.speed_field.clone(),
            default_speed: self.default_speed,
            strategy: self.strategy,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.travel_cost.is_finite() || self.travel_cost < 0.0 {
            return Err(Error::InvalidParameter {
                name: "travel_cost",
                value: self.travel_cost.to_string(),
                reason: "must be finite and >= 0".into(),
            });
        }
        Ok(())
    }
}

/// Result of a service area extraction
#[derive(Debug, Clone)]
pub struct ServiceAreaOutput {
    /// Reachable sub-network as one MultiLineString feature
    pub lines: FeatureCollection,
    /// Boundary points (two MultiPoint features) when requested
    pub bounds: Option<FeatureCollection>,
    /// Number of graph vertices within the cutoff
    pub reachable_vertices: usize,
}

/// The capability the batch driver depends on: compute one service area
/// for one cutoff. Lets drivers be tested against fakes and leaves room
/// for alternative engines.
pub trait ServiceAreaProvider {
    fn service_area(
        &self,
        network: &FeatureCollection,
        starts: &FeatureCollection,
        params: &ServiceAreaParams,
    ) -> Result<ServiceAreaOutput>;
}

/// Provider backed by the native graph engine
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkProvider;

impl ServiceAreaProvider for NetworkProvider {
    fn service_area(
        &self,
        network: &FeatureCollection,
        starts: &FeatureCollection,
        params: &ServiceAreaParams,
    ) -> Result<ServiceAreaOutput> {
        service_area(network, starts, params)
    }
}

/// Compute a service area over `network` from `starts`.
///
/// Builds the graph, snaps every start point to its nearest vertex, runs
/// a multi-source shortest-cost search capped at `params.travel_cost`,
/// and extracts the reachable sub-network.
pub fn service_area(
    network: &FeatureCollection,
    starts: &FeatureCollection,
    params: &ServiceAreaParams,
) -> Result<ServiceAreaOutput> {
    params.validate()?;
    let cutoff = params.travel_cost;

    let graph = NetworkGraph::build(network, &params.graph_params())?;

    let mut sources: Vec<usize> = Vec::new();
    for coord in start_coords(starts) {
        if let Some(v) = graph.nearest_vertex(coord) {
            if !sources.contains(&v) {
                sources.push(v);
            }
        }
    }
    if sources.is_empty() {
        return Err(Error::EmptyLayer("start points".into()));
    }
    debug!(starts = sources.len(), cutoff, "seeding search");

    let costs = shortest_costs(&graph, &sources, cutoff);
    let reachable_vertices = costs.iter().filter(|c| c.is_finite()).count();

    let mut parts: Vec<LineString<f64>> = Vec::new();
    let mut lower: Vec<Point<f64>> = Vec::new();
    let mut upper: Vec<Point<f64>> = Vec::new();

    for seg in graph.segments() {
        let (a, b) = (graph.vertex(seg.a), graph.vertex(seg.b));
        let (ca, cb) = (costs[seg.a], costs[seg.b]);

        if ca <= cutoff && cb <= cutoff {
            parts.push(LineString::from(vec![a, b]));
            continue;
        }

        // Crossing segment: cut from each end that can enter it
        if seg.forward && ca < cutoff {
            let frac = ((cutoff - ca) / seg.cost).clamp(0.0, 1.0);
            if frac > 0.0 {
                parts.push(LineString::from(vec![a, interpolate(a, b, frac)]));
            }
            lower.push(Point::from(a));
            upper.push(Point::from(b));
        }
        if seg.backward && cb < cutoff {
            let frac = ((cutoff - cb) / seg.cost).clamp(0.0, 1.0);
            if frac > 0.0 {
                parts.push(LineString::from(vec![b, interpolate(b, a, frac)]));
            }
            lower.push(Point::from(b));
            upper.push(Point::from(a));
        }
    }

    info!(
        segments = parts.len(),
        reachable_vertices, cutoff, "extracted service area"
    );

    let total_length: f64 = parts.iter().map(|ls| ls.length::<Euclidean>()).sum();
    let mut line_feature = Feature::new(Geometry::MultiLineString(MultiLineString::new(parts)));
    line_feature.set_property("cutoff", AttributeValue::Float(cutoff));
    line_feature.set_property("length", AttributeValue::Float(total_length));
    line_feature.set_property("start_count", AttributeValue::Int(sources.len() as i64));
    let mut lines = FeatureCollection::new();
    lines.push(line_feature);

    let bounds = params.include_bounds.then(|| {
        let mut fc = FeatureCollection::new();
        for (kind, points) in [("lower", lower), ("upper", upper)] {
            let mut f = Feature::new(Geometry::MultiPoint(MultiPoint::new(points)));
            f.set_property("type", AttributeValue::String(kind.into()));
            f.set_property("cutoff", AttributeValue::Float(cutoff));
            fc.push(f);
        }
        fc
    });

    Ok(ServiceAreaOutput {
        lines,
        bounds,
        reachable_vertices,
    })
}

fn interpolate(from: Coord<f64>, to: Coord<f64>, frac: f64) -> Coord<f64> {
    Coord {
        x: from.x + (to.x - from.x) * frac,
        y: from.y + (to.y - from.y) * frac,
    }
}

fn start_coords(starts: &FeatureCollection) -> Vec<Coord<f64>> {
    let mut coords = Vec::new();
    for feature in starts.iter() {
        match feature.geometry.as_ref() {
            Some(Geometry::Point(p)) => coords.push(p.0),
            Some(Geometry::MultiPoint(mp)) => coords.extend(mp.0.iter().map(|p| p.0)),
            _ => {}
        }
    }
    coords
}

/// Service area extraction as a named algorithm
#[derive(Debug, Clone, Default)]
pub struct ServiceArea;

/// Input pair for [`ServiceArea`]
#[derive(Debug, Clone)]
pub struct ServiceAreaInput {
    pub network: FeatureCollection,
    pub starts: FeatureCollection,
}

impl Algorithm for ServiceArea {
    type Input = ServiceAreaInput;
    type Output = ServiceAreaOutput;
    type Params = ServiceAreaParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ServiceArea"
    }

    fn description(&self) -> &'static str {
        "Extract the network reachable from start points within a travel-cost cutoff"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        service_area(&input.network, &input.starts, &params)
    }
}
