//! Queries against the active view.

use std::collections::BTreeMap;
use std::time::Duration;

use hostbridge_commands::{Command, CommandError, Document, HostJob, ViewId, parse_params};
use hostbridge_protocol::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::QUERY_TIMEOUT;

/// Element count returned when the caller gives no limit.
pub const DEFAULT_ELEMENT_LIMIT: usize = 100;

fn to_value(value: impl Serialize) -> Result<Value, CommandError> {
    serde_json::to_value(value)
        .map_err(|error| CommandError::internal(format!("cannot serialise result: {error}")))
}

/// Summarises the active view.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentViewInfo;

impl CurrentViewInfo {
    /// Method name.
    pub const NAME: &'static str = "get_current_view_info";
}

impl Command for CurrentViewInfo {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_timeout(&self) -> Option<Duration> {
        Some(QUERY_TIMEOUT)
    }

    fn prepare(
        &self,
        _params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        Ok(Box::new(|document: &mut Document| {
            let view = document.active_view()?;
            to_value(view)
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ViewElementsQuery {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    include_hidden: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ElementSummary<'a> {
    id: &'a str,
    name: &'a str,
    category: &'a str,
    properties: &'a BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewElements<'a> {
    view_id: &'a ViewId,
    view_name: &'a str,
    total_elements_in_view: usize,
    filtered_element_count: usize,
    elements: Vec<ElementSummary<'a>>,
}

/// Lists the elements shown in the active view.
///
/// Parameters: `category` restricts the listing to one category, `limit`
/// caps the number of elements returned (default 100, `0` means no cap),
/// and `includeHidden` adds hidden elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentViewElements;

impl CurrentViewElements {
    /// Method name.
    pub const NAME: &'static str = "get_current_view_elements";
}

impl Command for CurrentViewElements {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_timeout(&self) -> Option<Duration> {
        Some(QUERY_TIMEOUT)
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let query: ViewElementsQuery = parse_params(params)?;
        if query.category.as_deref().is_some_and(|category| category.trim().is_empty()) {
            return Err(CommandError::invalid_params("category must not be empty"));
        }
        let limit = match query.limit {
            None => DEFAULT_ELEMENT_LIMIT,
            Some(0) => usize::MAX,
            Some(limit) => limit,
        };
        Ok(Box::new(move |document: &mut Document| {
            let view = document.active_view()?;
            let in_view: Vec<_> = document.elements_in_view(&view.id).collect();
            let matching: Vec<_> = in_view
                .iter()
                .copied()
                .filter(|element| query.include_hidden || !element.hidden)
                .filter(|element| {
                    query
                        .category
                        .as_deref()
                        .is_none_or(|category| element.category == category)
                })
                .collect();
            let elements = matching
                .iter()
                .take(limit)
                .map(|element| ElementSummary {
                    id: element.id.as_str(),
                    name: &element.name,
                    category: &element.category,
                    properties: &element.properties,
                })
                .collect();
            to_value(ViewElements {
                view_id: &view.id,
                view_name: &view.name,
                total_elements_in_view: in_view.len(),
                filtered_element_count: matching.len(),
                elements,
            })
        }))
    }
}
