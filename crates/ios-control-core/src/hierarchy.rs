//! UI hierarchy model and text-to-coordinate resolution.
//!
//! Automation backends emit loosely-shaped JSON: an element may be an object
//! with any of `text`/`label`/`name`, bounds under `bounds` or `frame` in one
//! of several encodings, and children under `children` or `elements`; a node
//! may also be a bare array of nodes. [`UiNode`] normalizes that into a sum
//! type once, so the search itself never inspects raw JSON.
//!
//! Field lookups follow JSON truthiness: `null`, `false`, `0`, `""`, `[]` and
//! `{}` count as absent, so `{"text": "", "label": "OK"}` has the text `OK`.
//!
//! # Example
//!
//! ```
//! use ios_control_core::hierarchy::{find_element_by_text, UiNode};
//!
//! let json = serde_json::json!({
//!     "children": [
//!         { "label": "Sign In", "frame": { "x": 20, "y": 40, "width": 100, "height": 30 } }
//!     ]
//! });
//! let root = UiNode::from_value(&json);
//! assert_eq!(find_element_by_text(&root, "sign", false), Some((70, 55)));
//! ```

use serde_json::Value;

/// Text fields, in priority order.
const TEXT_KEYS: [&str; 3] = ["text", "label", "name"];
/// Bounds fields, in priority order.
const BOUNDS_KEYS: [&str; 2] = ["bounds", "frame"];
/// Children fields, in priority order.
const CHILDREN_KEYS: [&str; 2] = ["children", "elements"];

/// Center returned for bounds present in an unrecognized shape.
pub const FALLBACK_CENTER: (i32, i32) = (100, 100);

/// A node of a UI hierarchy dump.
#[derive(Debug, Clone, PartialEq)]
pub enum UiNode {
    /// An object node.
    Element(UiElement),
    /// An array of nodes.
    Collection(Vec<UiNode>),
    /// Anything else (strings, numbers, raw dumps). Never matches.
    Opaque,
}

/// An element with its normalized text, bounds and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiElement {
    /// First non-empty of `text`, `label`, `name`.
    pub text: Option<String>,
    /// First non-empty of `bounds`, `frame`.
    pub bounds: Option<Bounds>,
    /// Nodes under the first non-empty of `children`, `elements`.
    pub children: Vec<UiNode>,
}

/// The screen region of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    /// `{x, y, width, height}`
    Frame { x: f64, y: f64, width: f64, height: f64 },
    /// `{left, top, right, bottom}`
    Edges { left: f64, top: f64, right: f64, bottom: f64 },
    /// A 4-element array. Which of the two encodings it carries is not known;
    /// it is centered as edges.
    Positional([f64; 4]),
    /// Present but in no known shape.
    Unrecognized,
}

/// Raw output of a hierarchy fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyDump {
    /// Structured JSON from the primary backend.
    Json(Value),
    /// Unstructured text from the fallback backend.
    Raw(String),
}

impl HierarchyDump {
    /// Builds the searchable tree. A raw dump has no structure to search.
    pub fn root(&self) -> UiNode {
        match self {
            HierarchyDump::Json(value) => UiNode::from_value(value),
            HierarchyDump::Raw(_) => UiNode::Opaque,
        }
    }

    /// JSON view of the dump; raw text is wrapped as `{"hierarchy": text}`.
    pub fn to_value(&self) -> Value {
        match self {
            HierarchyDump::Json(value) => value.clone(),
            HierarchyDump::Raw(text) => serde_json::json!({ "hierarchy": text }),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_truthy<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| is_truthy(value))
}

impl UiNode {
    /// Normalizes a JSON value into a hierarchy tree.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let text = first_truthy(map, &TEXT_KEYS)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let bounds = first_truthy(map, &BOUNDS_KEYS).map(Bounds::from_value);
                let children = match first_truthy(map, &CHILDREN_KEYS) {
                    Some(Value::Array(items)) => items.iter().map(UiNode::from_value).collect(),
                    _ => Vec::new(),
                };
                UiNode::Element(UiElement { text, bounds, children })
            }
            Value::Array(items) => UiNode::Collection(items.iter().map(UiNode::from_value).collect()),
            _ => UiNode::Opaque,
        }
    }

    /// Parses a JSON document into a hierarchy tree.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(&value))
    }
}

fn number(map: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

impl Bounds {
    /// Classifies a bounds value. Object encodings are tried frame first.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                if let (Some(x), Some(y), Some(width), Some(height)) = (
                    number(map, "x"),
                    number(map, "y"),
                    number(map, "width"),
                    number(map, "height"),
                ) {
                    return Bounds::Frame { x, y, width, height };
                }
                if let (Some(left), Some(top), Some(right), Some(bottom)) = (
                    number(map, "left"),
                    number(map, "top"),
                    number(map, "right"),
                    number(map, "bottom"),
                ) {
                    return Bounds::Edges { left, top, right, bottom };
                }
                Bounds::Unrecognized
            }
            Value::Array(items) if items.len() >= 4 => {
                let mut quad = [0.0; 4];
                for (slot, item) in quad.iter_mut().zip(items) {
                    match item.as_f64() {
                        Some(n) => *slot = n,
                        None => return Bounds::Unrecognized,
                    }
                }
                Bounds::Positional(quad)
            }
            _ => Bounds::Unrecognized,
        }
    }

    /// Integer center point, using floor division.
    pub fn center(&self) -> (i32, i32) {
        match *self {
            Bounds::Frame { x, y, width, height } => (
                (x + (width / 2.0).floor()).floor() as i32,
                (y + (height / 2.0).floor()).floor() as i32,
            ),
            Bounds::Edges { left, top, right, bottom } => (
                ((left + right) / 2.0).floor() as i32,
                ((top + bottom) / 2.0).floor() as i32,
            ),
            Bounds::Positional([a, b, c, d]) => {
                (((a + c) / 2.0).floor() as i32, ((b + d) / 2.0).floor() as i32)
            }
            Bounds::Unrecognized => FALLBACK_CENTER,
        }
    }
}

fn text_matches(candidate: &str, query: &str, exact_match: bool) -> bool {
    if exact_match {
        candidate == query
    } else {
        candidate.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Returns the center of the first element, in depth-first pre-order, whose
/// text matches `text` and which carries bounds.
///
/// With `exact_match` the comparison is case-sensitive equality; otherwise it
/// is a case-insensitive substring test. A matching element without bounds is
/// skipped and the search continues into its children.
pub fn find_element_by_text(node: &UiNode, text: &str, exact_match: bool) -> Option<(i32, i32)> {
    match node {
        UiNode::Element(element) => {
            if let (Some(candidate), Some(bounds)) = (&element.text, &element.bounds) {
                if text_matches(candidate, text, exact_match) {
                    return Some(bounds.center());
                }
            }
            element
                .children
                .iter()
                .find_map(|child| find_element_by_text(child, text, exact_match))
        }
        UiNode::Collection(items) => items
            .iter()
            .find_map(|item| find_element_by_text(item, text, exact_match)),
        UiNode::Opaque => None,
    }
}
