//! Graph results as scene elements

use mathboard_shared::{Element, ElementKind, GraphResult};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A computation failure shown next to the graph or element it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineError {
    /// Expression or element the error belongs to, if known
    pub target: Option<String>,
    pub message: String,
}

impl InlineError {
    pub fn new(target: Option<String>, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

/// Short content fingerprint. A changed function gets a new id and with it a
/// fresh live object, since curve definitions are creation-time config.
fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

/// `prefix-print`, suffixed with a counter only when an identical entry
/// already took that id.
fn unique_id(prefix: &str, print: &str, taken: &mut HashSet<String>) -> String {
    let base = format!("{prefix}-{print}");
    let mut id = base.clone();
    let mut n = 1;
    while !taken.insert(id.clone()) {
        n += 1;
        id = format!("{base}-{n}");
    }
    id
}

/// Turn a graph result into curve elements plus fixed annotation points.
///
/// Entries carrying an error are not drawn; they come back as inline errors.
pub fn graph_elements(result: &GraphResult) -> (Vec<Element>, Vec<InlineError>) {
    let mut elements = Vec::with_capacity(result.graphs.len() + result.annotations.len());
    let mut errors = Vec::new();
    let mut taken = HashSet::new();

    for graph in &result.graphs {
        let target = graph.original.clone().or_else(|| graph.label.clone());
        if let Some(error) = graph.error.as_deref().filter(|e| !e.trim().is_empty()) {
            errors.push(InlineError::new(target, error));
            continue;
        }
        if graph.function.trim().is_empty() {
            errors.push(InlineError::new(target, "empty function body"));
            continue;
        }

        let print = fingerprint(&[graph.function.as_str(), graph.color.as_str()]);
        let id = unique_id("graph", &print, &mut taken);
        let mut curve = Element::new(id, ElementKind::Curve, Vec::new())
            .with_prop("fn", graph.function.as_str())
            .with_prop("strokeColor", graph.color.as_str());
        if let Some(latex) = &graph.latex {
            curve = curve.with_prop("latex", latex.as_str());
        }
        if let Some(label) = &graph.label {
            curve = curve.with_prop("name", label.as_str());
        }
        elements.push(curve);
    }

    for note in &result.annotations {
        let id = unique_id("note", &fingerprint(&[note.text.as_str()]), &mut taken);
        elements.push(
            Element::point(id, note.x, note.y)
                .with_prop("name", note.text.as_str())
                .with_prop("fixed", true),
        );
    }

    (elements, errors)
}
