//! Visualization export.
//!
//! Produces bounded node/edge payloads for the UI collaborators in three
//! interchangeable formats (d3-force, Cytoscape.js, vis-network).

pub mod export;
pub mod models;

pub use export::VizExporter;
pub use models::{VizEdge, VizFormat, VizNode, VizOptions};
