//! The authoritative element list

use crate::{Result, SceneError};
use mathboard_shared::{Element, ElementId, Parent};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

/// A change requested by a gesture or an explicit user action
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMutation {
    /// Replace a free point's position (drag end)
    MovePoint { id: ElementId, x: f64, y: f64 },
    SetVisibility { id: ElementId, visible: bool },
    /// Delete an element and everything depending on it
    Delete { id: ElementId },
}

/// Declarative scene, the single owner of all elements.
///
/// Elements reference each other only by id. Every mutation bumps
/// [`revision`](Self::revision).
#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    elements: Vec<Element>,
    index: HashMap<ElementId, usize>,
    revision: u64,
}

impl SceneModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Result<Self> {
        let mut model = Self::new();
        model.replace_all(elements)?;
        Ok(model)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.index.contains_key(id)
    }

    /// Add one element. Its parents must already be in the model.
    pub fn insert(&mut self, element: Element) -> Result<()> {
        if self.contains(&element.id) {
            return Err(SceneError::DuplicateId(element.id));
        }
        if let Some(parent) = element.parent_refs().find(|p| !self.contains(p)) {
            return Err(SceneError::DanglingParent {
                id: element.id.clone(),
                parent: parent.clone(),
            });
        }

        self.index.insert(element.id.clone(), self.elements.len());
        self.elements.push(element);
        self.revision += 1;
        Ok(())
    }

    /// Replace the whole list, e.g. when a new geometry result arrives.
    ///
    /// Ids must be unique. Dangling parents are accepted here; the
    /// reconciler defers such elements until their parents exist.
    pub fn replace_all(&mut self, elements: Vec<Element>) -> Result<()> {
        let mut seen = HashSet::with_capacity(elements.len());
        for element in &elements {
            if !seen.insert(&element.id) {
                return Err(SceneError::DuplicateId(element.id.clone()));
            }
        }
        for element in &elements {
            if let Some(parent) = element.parent_refs().find(|p| !seen.contains(p)) {
                log::debug!("Element {} references missing parent {}", element.id, parent);
            }
        }

        self.elements = elements;
        self.reindex();
        self.revision += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
        self.revision += 1;
    }

    /// Move a free point to new coordinates.
    pub fn set_point_position(&mut self, id: &ElementId, x: f64, y: f64) -> Result<()> {
        let element = self.get_mut(id)?;
        if element.point_position().is_none() {
            return Err(SceneError::NotAFreePoint(id.clone()));
        }
        element.parents = vec![Parent::Number(x), Parent::Number(y)];
        self.revision += 1;
        Ok(())
    }

    pub fn set_visibility(&mut self, id: &ElementId, visible: bool) -> Result<()> {
        let element = self.get_mut(id)?;
        element.props.insert("visible".to_string(), Value::Bool(visible));
        self.revision += 1;
        Ok(())
    }

    /// Add a free point placed directly by the user.
    pub fn place_point(&mut self, x: f64, y: f64) -> ElementId {
        let mut id = ElementId::generate("P");
        while self.contains(&id) {
            id = ElementId::generate("P");
        }

        self.index.insert(id.clone(), self.elements.len());
        self.elements.push(Element::point(id.as_str(), x, y));
        self.revision += 1;
        id
    }

    /// `id` followed by every element transitively referencing it, in
    /// breadth-first order.
    pub fn dependency_closure(&self, id: &ElementId) -> Vec<ElementId> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut children: HashMap<&ElementId, Vec<&ElementId>> = HashMap::new();
        for element in &self.elements {
            for parent in element.parent_refs() {
                children.entry(parent).or_default().push(&element.id);
            }
        }

        let mut closure = vec![id.clone()];
        let mut visited: HashSet<&ElementId> = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for &child in children.get(current).into_iter().flatten() {
                if visited.insert(child) {
                    closure.push(child.clone());
                    queue.push_back(child);
                }
            }
        }
        closure
    }

    /// Remove `id` together with its whole dependency closure as a single
    /// mutation. Returns the removed ids.
    pub fn delete_cascade(&mut self, id: &ElementId) -> Result<Vec<ElementId>> {
        let closure = self.dependency_closure(id);
        if closure.is_empty() {
            return Err(SceneError::NotFound(id.clone()));
        }

        let doomed: HashSet<&ElementId> = closure.iter().collect();
        self.elements.retain(|e| !doomed.contains(&e.id));
        self.reindex();
        self.revision += 1;

        log::debug!("Deleted {} and {} dependent(s)", id, closure.len() - 1);
        Ok(closure)
    }

    pub fn apply(&mut self, mutation: SceneMutation) -> Result<()> {
        match mutation {
            SceneMutation::MovePoint { id, x, y } => self.set_point_position(&id, x, y),
            SceneMutation::SetVisibility { id, visible } => self.set_visibility(&id, visible),
            SceneMutation::Delete { id } => self.delete_cascade(&id).map(|_| ()),
        }
    }

    fn get_mut(&mut self, id: &ElementId) -> Result<&mut Element> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.elements[i]),
            None => Err(SceneError::NotFound(id.clone())),
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }
}
