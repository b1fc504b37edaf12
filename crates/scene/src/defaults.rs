//! Per-type creation defaults merged under element props

use mathboard_shared::{ElementKind, Props};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ElementDefaults {
    by_kind: HashMap<ElementKind, Props>,
}

impl ElementDefaults {
    /// No defaults at all.
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    pub fn set(&mut self, kind: ElementKind, key: &str, value: impl Into<Value>) {
        self.by_kind
            .entry(kind)
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, kind: ElementKind) -> Option<&Props> {
        self.by_kind.get(&kind)
    }

    /// Defaults for `kind` overridden by the element's own props.
    pub fn merge(&self, kind: ElementKind, props: &Props) -> Props {
        let mut merged = self.by_kind.get(&kind).cloned().unwrap_or_default();
        for (key, value) in props {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl Default for ElementDefaults {
    fn default() -> Self {
        let mut defaults = Self::empty();
        let presets = [
            (
                ElementKind::Point,
                json!({ "size": 3, "strokeColor": "#2563eb", "fillColor": "#2563eb", "withLabel": true }),
            ),
            (
                ElementKind::Line,
                json!({ "strokeColor": "#475569", "strokeWidth": 2 }),
            ),
            (
                ElementKind::Segment,
                json!({ "strokeColor": "#475569", "strokeWidth": 2 }),
            ),
            (
                ElementKind::Circle,
                json!({ "strokeColor": "#0f766e", "strokeWidth": 2, "fillOpacity": 0 }),
            ),
            (
                ElementKind::Polygon,
                json!({ "fillColor": "#93c5fd", "fillOpacity": 0.3, "borders": { "strokeWidth": 2 } }),
            ),
            (ElementKind::Angle, json!({ "radius": 1, "fillOpacity": 0.2 })),
            (ElementKind::Sector, json!({ "fillOpacity": 0.2 })),
            (
                ElementKind::Curve,
                json!({ "strokeWidth": 2, "strokeColor": "#2563eb", "highlight": false }),
            ),
            (ElementKind::Text, json!({ "fontSize": 14, "fixed": true })),
            (ElementKind::Image, json!({ "fixed": true })),
        ];

        for (kind, preset) in presets {
            if let Value::Object(props) = preset {
                defaults.by_kind.insert(kind, props);
            }
        }
        defaults
    }
}
