use serde::{Deserialize, Serialize};

use cmis_types::{IncludeRelationships, PropertyFilter, RenditionFilter, UnfileObject, VersioningState};

use crate::error::{ObjectError, ObjectResult};

/// The defaults applied to every optional operation parameter the caller
/// leaves unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationDefaults {
    /// Versioning state of new documents.
    pub versioning_state: VersioningState,
    pub include_relationships: IncludeRelationships,
    /// `cmis:none` unless configured otherwise.
    pub rendition_filter: RenditionFilter,
    /// `None` lets the repository pick its default property set.
    pub property_filter: Option<PropertyFilter>,
    pub include_allowable_actions: bool,
    pub include_policy_ids: bool,
    pub include_acl: bool,
    /// Whether `setContentStream` replaces existing content.
    pub overwrite_content: bool,
    /// Whether deletes remove the whole version series.
    pub all_versions: bool,
    pub unfile_objects: UnfileObject,
    pub continue_on_failure: bool,
}

impl Default for OperationDefaults {
    fn default() -> Self {
        Self {
            versioning_state: VersioningState::DEFAULT,
            include_relationships: IncludeRelationships::DEFAULT,
            rendition_filter: RenditionFilter::None,
            property_filter: None,
            include_allowable_actions: false,
            include_policy_ids: false,
            include_acl: false,
            overwrite_content: true,
            all_versions: true,
            unfile_objects: UnfileObject::DEFAULT,
            continue_on_failure: false,
        }
    }
}

/// Configuration for an [`crate::ObjectService`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectServiceConfig {
    /// Repository every request is addressed to.
    pub repository_id: String,
    /// When `true`, mutations presented without a change token are rejected
    /// locally instead of skipping the concurrency check.
    pub require_change_tokens: bool,
    pub defaults: OperationDefaults,
}

impl ObjectServiceConfig {
    /// Default configuration for the given repository.
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            ..Default::default()
        }
    }

    pub fn with_defaults(mut self, defaults: OperationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_required_change_tokens(mut self, required: bool) -> Self {
        self.require_change_tokens = required;
        self
    }

    /// Parse and validate a TOML document.
    ///
    /// ```toml
    /// repository_id = "main"
    /// require_change_tokens = true
    ///
    /// [defaults]
    /// versioning_state = "minor"
    /// rendition_filter = "cmis:thumbnail"
    /// continue_on_failure = true
    /// ```
    pub fn from_toml_str(source: &str) -> ObjectResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ObjectError::InvalidArgument(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ObjectResult<String> {
        toml::to_string(self)
            .map_err(|e| ObjectError::InvalidArgument(format!("unserializable configuration: {e}")))
    }

    pub fn validate(&self) -> ObjectResult<()> {
        if self.repository_id.trim().is_empty() {
            return Err(ObjectError::InvalidArgument(
                "repository_id must not be empty".into(),
            ));
        }
        Ok(())
    }
}
