//! In-memory document owned by the host context.
//!
//! The [`Document`] is only ever touched from the host thread. Reads go
//! through plain accessors; every mutation happens inside
//! [`Document::transaction`], which snapshots the element store and restores
//! it when the closure fails, so a failed command leaves no partial edits
//! behind.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use hostbridge_protocol::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::CommandError;

const DOCUMENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::document");

/// First element identifier handed out by a fresh document.
const FIRST_ELEMENT_ID: u64 = 1000;

/// Stable identifier of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A model or annotation element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element identifier.
    pub id: ElementId,
    /// Category name, for example `Walls`.
    pub category: String,
    /// Display name.
    pub name: String,
    /// Owning view for view-specific elements; `None` for model elements
    /// visible in every view.
    pub owner_view: Option<ViewId>,
    /// Whether the element is hidden.
    pub hidden: bool,
    /// Free-form properties.
    pub properties: BTreeMap<String, Value>,
}

impl Element {
    /// Returns `true` when the element shows up in `view`.
    #[must_use]
    pub fn is_in_view(&self, view: &ViewId) -> bool {
        self.owner_view.as_ref().is_none_or(|owner| owner == view)
    }
}

/// A view onto the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// View identifier.
    pub id: ViewId,
    /// Display name.
    pub name: String,
    /// Kind of view, for example `FloorPlan`.
    pub view_type: String,
    /// Drawing scale denominator.
    pub scale: u32,
    /// Level of detail shown.
    pub detail_level: String,
    /// Whether the view is a template.
    pub is_template: bool,
}

impl View {
    /// Builds a non-template view with medium detail.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        view_type: impl Into<String>,
        scale: u32,
    ) -> Self {
        Self {
            id: ViewId::new(id),
            name: name.into(),
            view_type: view_type.into(),
            scale,
            detail_level: String::from("Medium"),
            is_template: false,
        }
    }
}

/// Input for a new element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElement {
    /// Category name.
    pub category: String,
    /// Display name.
    pub name: String,
    /// Owning view, if the element is view-specific.
    #[serde(default)]
    pub owner_view: Option<ViewId>,
    /// Initial properties.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl NewElement {
    /// Builds a model element with no properties.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            owner_view: None,
            properties: BTreeMap::new(),
        }
    }
}

/// Errors raised by document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// No element carries the identifier.
    #[error("element '{id}' not found")]
    ElementNotFound {
        /// Missing identifier.
        id: ElementId,
    },
    /// No view carries the identifier.
    #[error("view '{id}' not found")]
    ViewNotFound {
        /// Missing identifier.
        id: ViewId,
    },
    /// The document has no active view.
    #[error("document has no active view")]
    NoActiveView,
    /// The element definition was rejected.
    #[error("cannot create element: {message}")]
    InvalidElement {
        /// Reason for the rejection.
        message: String,
    },
}

impl From<DocumentError> for CommandError {
    fn from(error: DocumentError) -> Self {
        let code = match &error {
            DocumentError::ElementNotFound { .. } => ErrorCode::ElementNotFound,
            DocumentError::ViewNotFound { .. } | DocumentError::NoActiveView => {
                ErrorCode::ViewNotFound
            }
            DocumentError::InvalidElement { .. } => ErrorCode::ElementCreationFailed,
        };
        Self::host(code, error.to_string())
    }
}

/// The host document.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    elements: BTreeMap<ElementId, Element>,
    views: Vec<View>,
    active_view: Option<ViewId>,
    next_element_id: u64,
    revision: u64,
}

impl Document {
    /// Creates an empty document with a single active floor plan view.
    pub fn new(title: impl Into<String>) -> Self {
        let level_one = View::new("1", "Level 1", "FloorPlan", 100);
        let active = level_one.id.clone();
        Self {
            title: title.into(),
            elements: BTreeMap::new(),
            views: vec![level_one],
            active_view: Some(active),
            next_element_id: FIRST_ELEMENT_ID,
            revision: 0,
        }
    }

    /// Returns the document title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the number of committed transactions.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns every view in creation order.
    #[must_use]
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Adds a view; the first view added to a document without an active
    /// view becomes active.
    pub fn add_view(&mut self, view: View) {
        if self.active_view.is_none() {
            self.active_view = Some(view.id.clone());
        }
        self.views.push(view);
    }

    /// Returns the active view.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NoActiveView`] when no view is active.
    pub fn active_view(&self) -> Result<&View, DocumentError> {
        let id = self.active_view.as_ref().ok_or(DocumentError::NoActiveView)?;
        self.views
            .iter()
            .find(|view| &view.id == id)
            .ok_or_else(|| DocumentError::ViewNotFound { id: id.clone() })
    }

    /// Activates the view with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ViewNotFound`] for unknown identifiers.
    pub fn set_active_view(&mut self, id: &ViewId) -> Result<(), DocumentError> {
        if !self.views.iter().any(|view| &view.id == id) {
            return Err(DocumentError::ViewNotFound { id: id.clone() });
        }
        self.active_view = Some(id.clone());
        Ok(())
    }

    /// Looks up an element.
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Iterates over all elements in identifier order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Iterates over elements shown in `view`.
    pub fn elements_in_view<'a>(&'a self, view: &'a ViewId) -> impl Iterator<Item = &'a Element> {
        self.elements.values().filter(move |element| element.is_in_view(view))
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Runs `f` as a named transaction.
    ///
    /// The element store is snapshotted first. When `f` returns an error or
    /// panics the snapshot is restored and the revision is left untouched;
    /// otherwise the revision advances by one. A panic is resumed once the
    /// snapshot is back in place.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn transaction<T, E>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.elements.clone();
        let next_id = self.next_element_id;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            f(&mut Transaction { document: &mut *self })
        }));
        match outcome {
            Ok(Ok(value)) => {
                self.revision += 1;
                debug!(
                    target: DOCUMENT_TARGET,
                    transaction = name,
                    revision = self.revision,
                    "transaction committed"
                );
                Ok(value)
            }
            Ok(Err(error)) => {
                self.restore(snapshot, next_id);
                debug!(target: DOCUMENT_TARGET, transaction = name, "transaction rolled back");
                Err(error)
            }
            Err(payload) => {
                self.restore(snapshot, next_id);
                debug!(
                    target: DOCUMENT_TARGET,
                    transaction = name,
                    "transaction panicked; rolled back"
                );
                panic::resume_unwind(payload)
            }
        }
    }

    fn restore(&mut self, elements: BTreeMap<ElementId, Element>, next_element_id: u64) {
        self.elements = elements;
        self.next_element_id = next_element_id;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Mutable access to a document within [`Document::transaction`].
#[derive(Debug)]
pub struct Transaction<'a> {
    document: &'a mut Document,
}

impl Transaction<'_> {
    /// Returns the document being edited.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    /// Creates an element and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidElement`] when the category or name is
    /// blank and [`DocumentError::ViewNotFound`] when the owner view does not
    /// exist.
    pub fn create_element(&mut self, new: NewElement) -> Result<ElementId, DocumentError> {
        if new.category.trim().is_empty() {
            return Err(DocumentError::InvalidElement {
                message: String::from("category must not be empty"),
            });
        }
        if new.name.trim().is_empty() {
            return Err(DocumentError::InvalidElement {
                message: String::from("name must not be empty"),
            });
        }
        if let Some(owner) = &new.owner_view {
            if !self.document.views.iter().any(|view| &view.id == owner) {
                return Err(DocumentError::ViewNotFound { id: owner.clone() });
            }
        }
        let id = ElementId(self.document.next_element_id.to_string());
        self.document.next_element_id += 1;
        let element = Element {
            id: id.clone(),
            category: new.category,
            name: new.name,
            owner_view: new.owner_view,
            hidden: false,
            properties: new.properties,
        };
        self.document.elements.insert(id.clone(), element);
        Ok(id)
    }

    /// Deletes an element.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown identifiers.
    pub fn delete_element(&mut self, id: &ElementId) -> Result<Element, DocumentError> {
        self.document
            .elements
            .remove(id)
            .ok_or_else(|| DocumentError::ElementNotFound { id: id.clone() })
    }

    /// Sets or replaces a property on an element.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown identifiers.
    pub fn set_property(
        &mut self,
        id: &ElementId,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), DocumentError> {
        let element = self
            .document
            .elements
            .get_mut(id)
            .ok_or_else(|| DocumentError::ElementNotFound { id: id.clone() })?;
        element.properties.insert(key.into(), value);
        Ok(())
    }

    /// Hides or reveals an element.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ElementNotFound`] for unknown identifiers.
    pub fn set_hidden(&mut self, id: &ElementId, hidden: bool) -> Result<(), DocumentError> {
        let element = self
            .document
            .elements
            .get_mut(id)
            .ok_or_else(|| DocumentError::ElementNotFound { id: id.clone() })?;
        element.hidden = hidden;
        Ok(())
    }
}
