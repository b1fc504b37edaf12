//! Scene elements in their wire format
//!
//! `{ id, type, parents, props }` is the shape exchanged with the math engine
//! (geometry results) and with the intent service (scene context).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form per-element configuration (`name`, `color`, `fixed`, ...).
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Identifier of an element, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for elements created by direct user interaction.
    pub fn generate(prefix: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}-{}", &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Element types understood by the drawing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Point,
    Line,
    Segment,
    Circle,
    Polygon,
    Text,
    Angle,
    Sector,
    Curve,
    Image,
}

impl ElementKind {
    /// Dependency class used to order creation. Lower classes never
    /// reference higher ones, so creating in ascending order materializes
    /// parents before their children.
    pub fn dependency_class(self) -> u8 {
        match self {
            ElementKind::Point => 0,
            ElementKind::Line | ElementKind::Segment => 1,
            ElementKind::Circle | ElementKind::Polygon => 2,
            ElementKind::Angle | ElementKind::Sector | ElementKind::Curve => 3,
            ElementKind::Text | ElementKind::Image => 4,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Point => "point",
            ElementKind::Line => "line",
            ElementKind::Segment => "segment",
            ElementKind::Circle => "circle",
            ElementKind::Polygon => "polygon",
            ElementKind::Text => "text",
            ElementKind::Angle => "angle",
            ElementKind::Sector => "sector",
            ElementKind::Curve => "curve",
            ElementKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// One entry of an element's `parents` list.
///
/// A reference is weak: it names another element by id and carries no
/// ownership. Only the scene model owns elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parent {
    Number(f64),
    Ref(ElementId),
}

impl From<f64> for Parent {
    fn from(value: f64) -> Self {
        Parent::Number(value)
    }
}

impl From<&str> for Parent {
    fn from(value: &str) -> Self {
        Parent::Ref(ElementId::new(value))
    }
}

/// A single drawable entity of the scene model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub parents: Vec<Parent>,
    #[serde(default)]
    pub props: Props,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind, parents: Vec<Parent>) -> Self {
        Self {
            id: ElementId::new(id),
            kind,
            parents,
            props: Props::new(),
        }
    }

    /// Convenience constructor for a free point.
    pub fn point(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(id, ElementKind::Point, vec![Parent::Number(x), Parent::Number(y)])
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    /// Ids this element references as parents, in declaration order.
    pub fn parent_refs(&self) -> impl Iterator<Item = &ElementId> {
        self.parents.iter().filter_map(|p| match p {
            Parent::Ref(id) => Some(id),
            Parent::Number(_) => None,
        })
    }

    pub fn references(&self, id: &ElementId) -> bool {
        self.parent_refs().any(|p| p == id)
    }

    /// Position of a free point: a point whose parents are exactly two numbers.
    pub fn point_position(&self) -> Option<(f64, f64)> {
        if self.kind != ElementKind::Point {
            return None;
        }
        match self.parents.as_slice() {
            [Parent::Number(x), Parent::Number(y)] => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.props
            .get("fixed")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn is_visible(&self) -> bool {
        self.props
            .get("visible")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let value = json!({
            "id": "c1",
            "type": "circle",
            "parents": ["A", 3],
            "props": { "color": "red" }
        });

        let element: Element = serde_json::from_value(value).unwrap();
        assert_eq!(element.kind, ElementKind::Circle);
        assert_eq!(element.parents[0], Parent::Ref(ElementId::new("A")));
        assert_eq!(element.parents[1], Parent::Number(3.0));
        assert_eq!(element.props["color"], "red");
        assert_eq!(element.parent_refs().count(), 1);
    }

    #[test]
    fn test_missing_parents_and_props_default() {
        let element: Element =
            serde_json::from_value(json!({ "id": "t", "type": "text" })).unwrap();
        assert!(element.parents.is_empty());
        assert!(element.props.is_empty());
        assert!(element.is_visible());
        assert!(!element.is_fixed());
    }

    #[test]
    fn test_point_position() {
        let p = Element::point("P", 1.5, -2.0);
        assert_eq!(p.point_position(), Some((1.5, -2.0)));

        let glider = Element::new("G", ElementKind::Point, vec!["L".into(), 0.5.into()]);
        assert_eq!(glider.point_position(), None);
    }

    #[test]
    fn test_dependency_classes_are_ordered() {
        assert!(ElementKind::Point.dependency_class() < ElementKind::Segment.dependency_class());
        assert!(ElementKind::Segment.dependency_class() < ElementKind::Polygon.dependency_class());
        assert!(ElementKind::Polygon.dependency_class() < ElementKind::Angle.dependency_class());
        assert!(ElementKind::Curve.dependency_class() < ElementKind::Text.dependency_class());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ElementId::generate("pt");
        let b = ElementId::generate("pt");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("pt-"));
    }
}
