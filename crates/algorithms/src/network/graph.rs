//! Network graph construction from line layers
//!
//! Every segment of every line feature becomes one graph segment between
//! two snapped vertices. Vertices closer than the snapping tolerance
//! collapse into one, which is what stitches a layer of independent line
//! features into a connected network.

use geo_types::{Coord, Geometry, LineString};
use netreach_core::{Error, Feature, FeatureCollection, Result};
use std::collections::HashMap;
use tracing::debug;

/// Cost measure used for traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostStrategy {
    /// Cost is Euclidean segment length (layer units)
    #[default]
    Shortest,
    /// Cost is travel time: length / speed, with speed in km/h and
    /// length in meters, giving seconds
    Fastest,
}

/// Traversal direction of a line feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Digitization order only
    Forward,
    /// Against digitization order only
    Backward,
    /// Traversable both ways
    #[default]
    Both,
}

/// Parameters controlling graph construction
#[derive(Debug, Clone)]
pub struct GraphParams {
    /// Vertex snapping distance, in layer units. Zero snaps only exactly
    /// coincident endpoints.
    pub tolerance: f64,
    /// Attribute holding the per-feature direction value
    pub direction_field: Option<String>,
    /// Attribute value meaning forward-only
    pub value_forward: String,
    /// Attribute value meaning backward-only
    pub value_backward: String,
    /// Attribute value meaning both directions
    pub value_both: String,
    /// Direction when the field is absent or unmatched
    pub default_direction: Direction,
    /// Attribute holding the per-feature speed (km/h)
    pub speed_field: Option<String>,
    /// Speed when the field is absent or non-positive (km/h)
    pub default_speed: f64,
    /// Cost measure
    pub strategy: CostStrategy,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            tolerance: 5.0,
            direction_field: None,
            value_forward: String::new(),
            value_backward: String::new(),
            value_both: String::new(),
            default_direction: Direction::Both,
            speed_field: None,
            default_speed: 5.0,
            strategy: CostStrategy::Shortest,
        }
    }
}

impl GraphParams {
    fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                value: self.tolerance.to_string(),
                reason: "must be finite and >= 0".into(),
            });
        }
        if self.strategy == CostStrategy::Fastest && self.default_speed <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "default_speed",
                value: self.default_speed.to_string(),
                reason: "must be > 0 for the fastest strategy".into(),
            });
        }
        Ok(())
    }
}

/// One network segment between two snapped vertices
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub a: usize,
    pub b: usize,
    /// Traversal cost under the build strategy
    pub cost: f64,
    /// Traversable a -> b
    pub forward: bool,
    /// Traversable b -> a
    pub backward: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Arc {
    pub to: usize,
    pub cost: f64,
}

/// A routable network graph built from a line layer
#[derive(Debug)]
pub struct NetworkGraph {
    vertices: Vec<Coord<f64>>,
    segments: Vec<Segment>,
    out_arcs: Vec<Vec<Arc>>,
}

impl NetworkGraph {
    /// Build a graph from a line layer.
    ///
    /// Non-line features are skipped. Errors if the layer yields no
    /// segments at all.
    pub fn build(network: &FeatureCollection, params: &GraphParams) -> Result<Self> {
        params.validate()?;

        let mut builder = Builder {
            grid: HashMap::new(),
            cell: params.tolerance.max(1e-9),
            tolerance: params.tolerance,
            graph: NetworkGraph {
                vertices: Vec::new(),
                segments: Vec::new(),
                out_arcs: Vec::new(),
            },
        };

        for feature in network.iter() {
            let direction = feature_direction(feature, params);
            let speed = feature_speed(feature, params);
            let Some(geometry) = feature.geometry.as_ref() else {
                continue;
            };
            match geometry {
                Geometry::LineString(ls) => builder.add_line(ls, direction, speed, params),
                Geometry::MultiLineString(mls) => {
                    for ls in &mls.0 {
                        builder.add_line(ls, direction, speed, params);
                    }
                }
                Geometry::Line(l) => {
                    let ls = LineString::from(vec![l.start, l.end]);
                    builder.add_line(&ls, direction, speed, params);
                }
                _ => debug!(kind = feature.geometry_kind(), "skipping non-line feature"),
            }
        }

        let graph = builder.graph;
        if graph.segments.is_empty() {
            return Err(Error::EmptyLayer("network (no line segments)".into()));
        }
        debug!(
            vertices = graph.vertices.len(),
            segments = graph.segments.len(),
            "built network graph"
        );
        Ok(graph)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn vertex(&self, index: usize) -> Coord<f64> {
        self.vertices[index]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn out_arcs(&self, vertex: usize) -> &[Arc] {
        &self.out_arcs[vertex]
    }

    /// Index of the graph vertex nearest to `point`, or `None` for an
    /// empty graph. Linear scan; start points are few.
    pub fn nearest_vertex(&self, point: Coord<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = (v.x - point.x).hypot(v.y - point.y);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

struct Builder {
    grid: HashMap<(i64, i64), Vec<usize>>,
    cell: f64,
    tolerance: f64,
    graph: NetworkGraph,
}

impl Builder {
    fn add_line(
        &mut self,
        line: &LineString<f64>,
        direction: Direction,
        speed: f64,
        params: &GraphParams,
    ) {
        for pair in line.0.windows(2) {
            let a = self.snap(pair[0]);
            let b = self.snap(pair[1]);
            if a == b {
                // Segment collapsed by snapping
                continue;
            }
            let length = (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
            let cost = match params.strategy {
                CostStrategy::Shortest => length,
                CostStrategy::Fastest => length / (speed * 1000.0 / 3600.0),
            };
            let (forward, backward) = match direction {
                Direction::Forward => (true, false),
                Direction::Backward => (false, true),
                Direction::Both => (true, true),
            };
            self.graph.segments.push(Segment {
                a,
                b,
                cost,
                forward,
                backward,
            });
            if forward {
                self.graph.out_arcs[a].push(Arc { to: b, cost });
            }
            if backward {
                self.graph.out_arcs[b].push(Arc { to: a, cost });
            }
        }
    }

    /// Find a vertex within tolerance of `c`, or insert a new one.
    fn snap(&mut self, c: Coord<f64>) -> usize {
        let (cx, cy) = (
            (c.x / self.cell).floor() as i64,
            (c.y / self.cell).floor() as i64,
        );
        for gx in cx - 1..=cx + 1 {
            for gy in cy - 1..=cy + 1 {
                if let Some(indices) = self.grid.get(&(gx, gy)) {
                    for &i in indices {
                        let v = self.graph.vertices[i];
                        if (v.x - c.x).hypot(v.y - c.y) <= self.tolerance {
                            return i;
                        }
                    }
                }
            }
        }
        let index = self.graph.vertices.len();
        self.graph.vertices.push(c);
        self.graph.out_arcs.push(Vec::new());
        self.grid.entry((cx, cy)).or_default().push(index);
        index
    }
}

fn feature_direction(feature: &Feature, params: &GraphParams) -> Direction {
    let Some(field) = &params.direction_field else {
        return params.default_direction;
    };
    let Some(value) = feature.get_property(field).and_then(|v| v.as_str()) else {
        return params.default_direction;
    };
    if !params.value_forward.is_empty() && value == params.value_forward {
        Direction::Forward
    } else if !params.value_backward.is_empty() && value == params.value_backward {
        Direction::Backward
    } else if !params.value_both.is_empty() && value == params.value_both {
        Direction::Both
    } else {
        params.default_direction
    }
}

fn feature_speed(feature: &Feature, params: &GraphParams) -> f64 {
    params
        .speed_field
        .as_ref()
        .and_then(|field| feature.get_property(field))
        .and_then(|v| v.as_f64())
        .filter(|v| *v > 0.0)
        .unwrap_or(params.default_speed)
}
