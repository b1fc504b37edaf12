//! Results produced by the computation host
//!
//! A command produces exactly one of two shapes: a graph result (function
//! plots plus annotations) or a geometry result (a full element list).

use crate::element::Element;
use serde::{Deserialize, Serialize};

/// One plotted function of a graph result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    /// Renderer-compatible function body, e.g. `Math.sin(x)`
    #[serde(rename = "fn")]
    pub function: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Labelled point of interest (root, extremum, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
    pub success: bool,
    pub graphs: Vec<GraphEntry>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryResult {
    pub success: bool,
    pub elements: Vec<Element>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of executing one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandResult {
    Graph(GraphResult),
    Geometry(GeometryResult),
}

impl CommandResult {
    pub fn success(&self) -> bool {
        match self {
            CommandResult::Graph(g) => g.success,
            CommandResult::Geometry(g) => g.success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CommandResult::Graph(g) => g.error.as_deref(),
            CommandResult::Geometry(g) => g.error.as_deref(),
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            CommandResult::Graph(g) => &g.explanation,
            CommandResult::Geometry(g) => &g.explanation,
        }
    }

    /// Check the success/error invariant: a failed result carries a
    /// non-empty error and no deliverable payload.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.success() {
            return Ok(());
        }
        match self.error() {
            Some(e) if !e.trim().is_empty() => {}
            _ => return Err("failed result without an error message".to_string()),
        }
        let has_payload = match self {
            CommandResult::Graph(g) => !g.graphs.is_empty() || !g.annotations.is_empty(),
            CommandResult::Geometry(g) => !g.elements.is_empty(),
        };
        if has_payload {
            return Err("failed result carries payload".to_string());
        }
        Ok(())
    }

    /// Failure result of the given shape.
    pub fn failure_graph(error: impl Into<String>) -> Self {
        CommandResult::Graph(GraphResult {
            success: false,
            graphs: Vec::new(),
            annotations: Vec::new(),
            explanation: String::new(),
            error: Some(error.into()),
        })
    }
}
