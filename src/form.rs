//! Form extraction from provider pages
//!
//! Turns an HTML page into a [`FormDescriptor`] (absolute action URL, method
//! and field values) for exactly one form. Anything other than exactly one
//! match is a [`HydroError::StructuralMismatch`]: it means the provider
//! changed its markup and none of the later steps can be trusted.

use crate::error::{HydroError, Result};
use crate::http::Page;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

/// Predicate deciding whether an input element plays a given role
pub type FieldPredicate<'a> = &'a (dyn Fn(&InputElement) -> bool + Sync);

/// Owned snapshot of an `<input>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    /// `name` attribute, if any
    pub name: Option<String>,
    /// Lower-cased `type` attribute, `text` when absent
    pub input_type: String,
    /// `value` attribute, empty when absent
    pub value: String,
    /// Whether the `checked` attribute is present
    pub checked: bool,
}

impl InputElement {
    fn from_element(element: ElementRef<'_>) -> Self {
        let attrs = element.value();
        Self {
            name: attrs.attr("name").map(str::to_string),
            input_type: attrs
                .attr("type")
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
            value: attrs.attr("value").unwrap_or_default().to_string(),
            checked: attrs.attr("checked").is_some(),
        }
    }

    /// Value a browser would submit for this input, if any
    fn submitted_value(&self) -> Option<&str> {
        match self.input_type.as_str() {
            "checkbox" | "radio" if !self.checked => None,
            "checkbox" | "radio" if self.value.is_empty() => Some("on"),
            _ => Some(&self.value),
        }
    }
}

/// Matches plain text inputs (the username box on the login page)
pub fn is_text_input(input: &InputElement) -> bool {
    input.input_type == "text"
}

/// Matches password inputs
pub fn is_password_input(input: &InputElement) -> bool {
    input.input_type == "password"
}

/// A single form ready to be submitted once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescriptor {
    action: Url,
    method: String,
    fields: BTreeMap<String, String>,
}

impl FormDescriptor {
    /// Absolute URL the form posts to
    pub fn action(&self) -> &Url {
        &self.action
    }

    /// Upper-cased HTTP method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Field name to value mapping
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// A copy of this form with one field set to `value`
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Inputs found on a page, grouped by the role they were matched for
#[derive(Debug, Clone, Default)]
pub struct FieldSelection {
    roles: BTreeMap<String, Vec<InputElement>>,
}

impl FieldSelection {
    /// All inputs matched for `role`, in document order
    pub fn get(&self, role: &str) -> &[InputElement] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    /// The one input matched for `role`; any other count is a markup change
    pub fn require_single(&self, role: &str) -> Result<&InputElement> {
        match self.get(role) {
            [single] => Ok(single),
            matched => Err(HydroError::structural(format!(
                "Expected exactly one '{}' input, found {}",
                role,
                matched.len()
            ))),
        }
    }

    /// Name of the one input matched for `role`
    pub fn require_single_name(&self, role: &str) -> Result<&str> {
        self.require_single(role)?.name.as_deref().ok_or_else(|| {
            HydroError::structural(format!("The '{}' input has no name attribute", role))
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| HydroError::structural(format!("Invalid selector '{}': {}", selector, e)))
}

fn input_selector() -> Result<Selector> {
    parse_selector("input")
}

/// Extract the single form matching `selector`
pub fn extract_form(page: &Page, selector: &str) -> Result<FormDescriptor> {
    let (form, _) = extract_form_with_fields(page, selector, &[])?;
    Ok(form)
}

/// Extract the single form matching `selector` and collect inputs per role
///
/// Role predicates are evaluated over every input of the document, not only
/// the inputs of the matched form.
pub fn extract_form_with_fields(
    page: &Page,
    selector: &str,
    roles: &[(&str, FieldPredicate<'_>)],
) -> Result<(FormDescriptor, FieldSelection)> {
    let form_sel = parse_selector(selector)?;
    let input_sel = input_selector()?;
    let document = Html::parse_document(&page.body);

    let matches: Vec<ElementRef<'_>> = document.select(&form_sel).collect();
    let form = match matches.as_slice() {
        [form] => *form,
        _ => {
            return Err(HydroError::structural(format!(
                "Selector '{}' matched {} forms on {}, expected 1",
                selector,
                matches.len(),
                page.url
            )));
        }
    };
    if form.value().name() != "form" {
        return Err(HydroError::structural(format!(
            "Selector '{}' matched a <{}> element, not a form",
            selector,
            form.value().name()
        )));
    }

    let action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => page.url.join(action).map_err(|e| {
            HydroError::structural(format!("Form action '{}' is not a URL: {}", action, e))
        })?,
        _ => page.url.clone(),
    };
    let method = form
        .value()
        .attr("method")
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "GET".to_string());

    let mut fields = BTreeMap::new();
    for input in form.select(&input_sel).map(InputElement::from_element) {
        if let (Some(name), Some(value)) = (input.name.as_deref(), input.submitted_value()) {
            fields.insert(name.to_string(), value.to_string());
        }
    }

    let mut selection = FieldSelection::default();
    if !roles.is_empty() {
        let inputs: Vec<InputElement> = document
            .select(&input_sel)
            .map(InputElement::from_element)
            .collect();
        for (role, predicate) in roles {
            let matched = inputs.iter().filter(|i| predicate(i)).cloned().collect();
            selection.roles.insert((*role).to_string(), matched);
        }
    }

    Ok((
        FormDescriptor {
            action,
            method,
            fields,
        },
        selection,
    ))
}
