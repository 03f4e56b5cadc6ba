// src/compat.rs

//! Backward-compatibility shim for renamed custom elements.
//!
//! A legacy tag attached to a document is rewritten into its replacement
//! tag, carrying all attributes and children over in original order. When
//! the replacement is not registered yet, the element instead gains the
//! replacement's styling classes in place, preserving visual parity without
//! structural replacement. A single process-wide deprecation warning is
//! emitted the first time any legacy element is attached.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// A document element: a tag with ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Appends classes to the element's `class` attribute, creating the
    /// attribute if absent. Already-present classes are not duplicated.
    fn append_classes(&mut self, classes: &[String]) {
        match self.attributes.iter().position(|(name, _)| name == "class") {
            Some(index) => {
                let value = &mut self.attributes[index].1;
                for class in classes {
                    if !value.split_whitespace().any(|c| c == class) {
                        value.push(' ');
                        value.push_str(class);
                    }
                }
            }
            None => {
                self.attributes
                    .push(("class".to_string(), classes.join(" ")));
            }
        }
    }

    /// Space-separated class list, empty if no `class` attribute exists.
    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == "class")
            .map(|(_, value)| value.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// The set of registered custom element tags.
#[derive(Debug, Default)]
pub struct TagRegistry {
    defined: HashSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, tag: &str) {
        self.defined.insert(tag.to_string());
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.defined.contains(tag)
    }
}

/// Decision taken for a legacy element at attachment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimAction {
    /// The element was rebuilt under the replacement tag.
    Replaced,
    /// The element kept its tag and gained the replacement's classes.
    StyleMirrored,
}

/// Rewrites one legacy custom element tag into its replacement.
///
/// The warned-once state is explicit: false at construction, flipped on the
/// first legacy attachment, never reset.
pub struct LegacyShim {
    legacy_tag: String,
    replacement_tag: String,
    mirror_classes: Vec<String>,
    warned: AtomicBool,
}

impl LegacyShim {
    pub fn new(legacy_tag: &str, replacement_tag: &str, mirror_classes: &[&str]) -> Self {
        LegacyShim {
            legacy_tag: legacy_tag.to_string(),
            replacement_tag: replacement_tag.to_string(),
            mirror_classes: mirror_classes.iter().map(|c| c.to_string()).collect(),
            warned: AtomicBool::new(false),
        }
    }

    /// Whether the one-time deprecation warning has been emitted.
    pub fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }

    /// Applies the shim to an element being attached.
    ///
    /// Non-legacy elements pass through untouched. For a legacy element the
    /// two-state decision is resolved once, here: if the replacement tag is
    /// registered, the element is rebuilt under it with all attributes and
    /// children carried over in original order; otherwise the replacement's
    /// styling classes are added in place.
    ///
    /// # Returns
    /// The action taken, or `None` if the element is not the legacy tag.
    pub fn on_attach(&self, element: &mut Element, registry: &TagRegistry) -> Option<ShimAction> {
        if element.tag != self.legacy_tag {
            return None;
        }

        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!(
                "<{}> is deprecated; use <{}> instead.",
                self.legacy_tag, self.replacement_tag
            );
        }

        if registry.is_defined(&self.replacement_tag) {
            *element = Element {
                tag: self.replacement_tag.clone(),
                attributes: std::mem::take(&mut element.attributes),
                children: std::mem::take(&mut element.children),
            };
            Some(ShimAction::Replaced)
        } else {
            element.append_classes(&self.mirror_classes);
            Some(ShimAction::StyleMirrored)
        }
    }
}

impl Default for LegacyShim {
    /// The site kit's one legacy mapping: `<wb-notes>` → `<wb-issues>`.
    fn default() -> Self {
        LegacyShim::new("wb-notes", "wb-issues", &["wb-issues"])
    }
}

/// A document: a tag registry plus the elements attached so far.
#[derive(Debug, Default)]
pub struct Document {
    pub registry: TagRegistry,
    nodes: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an element, running the shim against it first.
    ///
    /// Attachment is the event that resolves the shim's decision; an element
    /// already in the document is never revisited.
    pub fn attach(&mut self, mut element: Element, shim: &LegacyShim) -> Option<ShimAction> {
        let action = shim.on_attach(&mut element, &self.registry);
        self.nodes.push(element);
        action
    }

    pub fn nodes(&self) -> &[Element] {
        &self.nodes
    }
}
