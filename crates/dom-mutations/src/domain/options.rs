//! Observation options
//!
//! Mirrors the `MutationObserverInit` dictionary. Field names serialize in
//! camelCase so the same JSON a browser accepts can be loaded here.
//!
//! # Example
//!
//! ```
//! use dom_mutations::ObserveOptions;
//!
//! let options = ObserveOptions::new()
//!     .attribute_filter(["class", "hidden"])
//!     .subtree(true);
//!
//! let normalized = options.normalize().unwrap();
//! assert!(normalized.attributes);
//! ```

use crate::error::ObserveError;
use serde::{Deserialize, Serialize};

/// Which change categories to observe.
///
/// `attributes`, `character_data` and the old-value flags are optional because
/// the DOM infers them from related fields. See [`ObserveOptions::normalize`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObserveOptions {
    /// Observe insertions and removals of children.
    pub child_list: bool,
    /// Observe attribute changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<bool>,
    /// Observe text content changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_data: Option<bool>,
    /// Extend observation to all descendants of the target.
    pub subtree: bool,
    /// Record the previous attribute value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_old_value: Option<bool>,
    /// Record the previous text value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_data_old_value: Option<bool>,
    /// Restrict attribute observation to these names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Empty options. Observing with these fails until a category is enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child_list(mut self, enabled: bool) -> Self {
        self.child_list = enabled;
        self
    }

    #[must_use]
    pub fn attributes(mut self, enabled: bool) -> Self {
        self.attributes = Some(enabled);
        self
    }

    #[must_use]
    pub fn character_data(mut self, enabled: bool) -> Self {
        self.character_data = Some(enabled);
        self
    }

    #[must_use]
    pub fn subtree(mut self, enabled: bool) -> Self {
        self.subtree = enabled;
        self
    }

    #[must_use]
    pub fn attribute_old_value(mut self, enabled: bool) -> Self {
        self.attribute_old_value = Some(enabled);
        self
    }

    #[must_use]
    pub fn character_data_old_value(mut self, enabled: bool) -> Self {
        self.character_data_old_value = Some(enabled);
        self
    }

    #[must_use]
    pub fn attribute_filter<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Resolve inferred flags and reject contradictory combinations.
    ///
    /// Follows the steps of `MutationObserver.observe()`:
    /// 1. `attributes` is implied by `attributeOldValue` or `attributeFilter`
    /// 2. `characterData` is implied by `characterDataOldValue`
    /// 3. at least one of `childList`, `attributes`, `characterData` must hold
    /// 4. explicit `false` cannot be combined with the fields that need it
    pub fn normalize(&self) -> Result<NormalizedOptions, ObserveError> {
        let attributes = self.attributes.unwrap_or(
            self.attribute_old_value.is_some() || self.attribute_filter.is_some(),
        );
        let character_data = self
            .character_data
            .unwrap_or(self.character_data_old_value.is_some());

        if !self.child_list && !attributes && !character_data {
            return Err(ObserveError::NothingToObserve);
        }

        let attribute_old_value = self.attribute_old_value.unwrap_or(false);
        if attribute_old_value && !attributes {
            return Err(ObserveError::AttributeOldValueWithoutAttributes);
        }

        if self.attribute_filter.is_some() && !attributes {
            return Err(ObserveError::AttributeFilterWithoutAttributes);
        }

        let character_data_old_value = self.character_data_old_value.unwrap_or(false);
        if character_data_old_value && !character_data {
            return Err(ObserveError::CharacterDataOldValueWithoutCharacterData);
        }

        Ok(NormalizedOptions {
            child_list: self.child_list,
            attributes,
            character_data,
            subtree: self.subtree,
            attribute_old_value,
            character_data_old_value,
            attribute_filter: self.attribute_filter.clone(),
        })
    }
}

/// Options after inference and validation, as handed to a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_filter: Option<Vec<String>>,
}

impl NormalizedOptions {
    /// Whether an attribute change named `name` passes the filter.
    #[must_use]
    pub fn accepts_attribute(&self, name: &str) -> bool {
        self.attribute_filter
            .as_ref()
            .map_or(true, |filter| filter.iter().any(|n| n == name))
    }
}
