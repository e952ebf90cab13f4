//! Element creation and deletion.
//!
//! Both commands edit the document inside a single transaction: either every
//! element in the request is created (or deleted) or none is.

use std::time::Duration;

use hostbridge_commands::{
    Command, CommandError, Document, ElementId, HostJob, NewElement, parse_params,
};
use hostbridge_protocol::RequestId;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{CREATE_TIMEOUT, DELETE_TIMEOUT};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateParams {
    elements: Vec<NewElement>,
}

/// Creates elements in one transaction and returns their identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateElements;

impl CreateElements {
    /// Method name.
    pub const NAME: &'static str = "create_elements";
}

impl Command for CreateElements {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_timeout(&self) -> Option<Duration> {
        Some(CREATE_TIMEOUT)
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let CreateParams { elements } = parse_params(params)?;
        if elements.is_empty() {
            return Err(CommandError::invalid_params("elements must not be empty"));
        }
        Ok(Box::new(move |document: &mut Document| {
            let created = document.transaction("Create Elements", |tx| {
                elements
                    .into_iter()
                    .map(|element| tx.create_element(element))
                    .collect::<Result<Vec<_>, _>>()
            })?;
            Ok(json!({ "created": created.len(), "elementIds": created }))
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeleteParams {
    element_ids: Vec<ElementId>,
}

/// Deletes elements by identifier in one transaction.
///
/// An unknown identifier fails the whole request and leaves the document
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteElements;

impl DeleteElements {
    /// Method name.
    pub const NAME: &'static str = "delete_element";
}

impl Command for DeleteElements {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_timeout(&self) -> Option<Duration> {
        Some(DELETE_TIMEOUT)
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let DeleteParams { element_ids } = parse_params(params)?;
        if element_ids.is_empty() {
            return Err(CommandError::invalid_params("elementIds must not be empty"));
        }
        Ok(Box::new(move |document: &mut Document| {
            let deleted = document.transaction("Delete Elements", |tx| {
                element_ids
                    .iter()
                    .map(|id| tx.delete_element(id).map(|element| element.id))
                    .collect::<Result<Vec<_>, _>>()
            })?;
            Ok(json!({ "deleted": deleted.len(), "elementIds": deleted }))
        }))
    }
}
