//! Functional equivalence of MaterialX documents
//!
//! Two documents are equivalent when they hold the same elements with the
//! same attributes, ignoring child order, excluded attributes and the
//! spelling of numbers (`1.50` and `1.5` compare equal).

use super::xml::{XmlElement, document_tree};
use super::{Document, MATERIAL_TYPE, attr};
use std::collections::HashSet;

const NUMERIC_TYPES: &[&str] = &[
    "integer", "float", "vector2", "vector3", "vector4", "color3", "color4", "matrix33",
    "matrix44",
];

/// Options controlling what counts as a difference
#[derive(Debug, Clone)]
pub struct EquivalenceOptions {
    /// Attributes never compared; `doc` is always excluded
    pub attribute_exclusions: HashSet<String>,
    /// Compare `value` attributes
    pub compare_values: bool,
    /// Drop material nodes from both documents before comparing
    pub ignore_materials: bool,
    /// Round float components to this many decimals before comparing
    pub precision: Option<usize>,
}

impl Default for EquivalenceOptions {
    fn default() -> Self {
        Self {
            attribute_exclusions: HashSet::from([attr::DOC.to_string()]),
            compare_values: true,
            ignore_materials: false,
            precision: None,
        }
    }
}

impl EquivalenceOptions {
    /// Exclude another attribute from comparison
    pub fn exclude(mut self, attribute: impl Into<String>) -> Self {
        self.attribute_exclusions.insert(attribute.into());
        self
    }
}

fn normalize_token(token: &str, precision: Option<usize>) -> String {
    let rounded;
    let mut token = token;
    if let Some(precision) = precision {
        if let Ok(number) = token.parse::<f64>() {
            rounded = format!("{number:.precision$}");
            token = &rounded;
        }
    }

    let stripped = token.trim_start_matches('0');
    let mut token = if stripped.is_empty() || stripped.starts_with('.') {
        format!("0{stripped}")
    } else {
        stripped.to_string()
    };
    if !token.contains('e') && token.contains('.') {
        let trimmed = token.trim_end_matches('0').trim_end_matches('.');
        token = trimmed.to_string();
    }
    token
}

/// Canonical spelling of a value string of the given type
pub fn normalize_value_string(value: &str, value_type: &str, precision: Option<usize>) -> String {
    if !NUMERIC_TYPES.contains(&value_type) {
        return value.to_string();
    }
    if value_type == "integer" {
        return value.trim().to_string();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| normalize_token(token, precision))
        .collect::<Vec<_>>()
        .join(", ")
}

fn normalize_tree(element: &mut XmlElement, precision: Option<usize>) {
    if let Some(value_type) = element.attributes.get(attr::TYPE).cloned() {
        if let Some(value) = element.attributes.get_mut(attr::VALUE) {
            *value = normalize_value_string(value, &value_type, precision);
        }
    }
    for child in &mut element.children {
        normalize_tree(child, precision);
    }
}

fn prepare(doc: &Document, options: &EquivalenceOptions) -> XmlElement {
    let mut tree = document_tree(doc);
    if options.ignore_materials {
        tree.children
            .retain(|child| child.attributes.get(attr::TYPE).map(String::as_str) != Some(MATERIAL_TYPE));
    }
    normalize_tree(&mut tree, options.precision);
    tree
}

fn name_of(element: &XmlElement) -> &str {
    element
        .attributes
        .get(attr::NAME)
        .map_or("", String::as_str)
}

fn compared_attributes<'a>(
    element: &'a XmlElement,
    options: &EquivalenceOptions,
) -> Vec<(&'a str, &'a str)> {
    let mut attributes: Vec<_> = element
        .attributes
        .iter()
        .filter(|(name, _)| !options.attribute_exclusions.contains(name.as_str()))
        .filter(|(name, _)| options.compare_values || name.as_str() != attr::VALUE)
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    attributes.sort_unstable();
    attributes
}

fn compare(lhs: &XmlElement, rhs: &XmlElement, options: &EquivalenceOptions) -> Result<(), String> {
    if lhs.tag != rhs.tag {
        return Err(format!("Mismatched category: {} vs {}", lhs.tag, rhs.tag));
    }
    let name = name_of(lhs);
    if name != name_of(rhs) {
        return Err(format!("Mismatched name: {} vs {}", name, name_of(rhs)));
    }

    let lhs_attributes = compared_attributes(lhs, options);
    let rhs_attributes = compared_attributes(rhs, options);
    if lhs_attributes != rhs_attributes {
        return Err(format!(
            "Mismatched attributes on {name}: {lhs_attributes:?} vs {rhs_attributes:?}"
        ));
    }

    if lhs.children.len() != rhs.children.len() {
        return Err(format!(
            "Mismatched number of children on {name}: {} vs {}",
            lhs.children.len(),
            rhs.children.len()
        ));
    }
    for child in &lhs.children {
        let child_name = name_of(child);
        let other = rhs
            .children
            .iter()
            .find(|other| name_of(other) == child_name && other.tag == child.tag)
            .ok_or_else(|| format!("Missing child {child_name} under {name}"))?;
        compare(child, other, options)?;
    }
    Ok(())
}

/// Check whether two documents are functionally equivalent.
///
/// Returns a description of the first difference found.
pub fn equivalent(lhs: &Document, rhs: &Document, options: &EquivalenceOptions) -> Result<(), String> {
    compare(&prepare(lhs, options), &prepare(rhs, options), options)
}
