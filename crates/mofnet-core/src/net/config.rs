use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Tag element for pseudo-atoms formed from atoms or collapsed fragments (Og).
pub const DEFAULT_PSEUDO_ATOM_ELEMENT: u8 = 118;
/// Tag element for connection sites (the dummy element).
pub const DEFAULT_CONNECTION_ELEMENT: u8 = 0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Connection weights must be non-negative with a positive sum (got {centroid}, {internal}, {external})")]
    InvalidWeights {
        centroid: f64,
        internal: f64,
        external: f64,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Relative weights of the three sites averaged when a collapsed fragment
/// is reconnected: the fragment centroid, the internal atom of the crossing
/// connection, and the external atom it led to.
///
/// Only constructible through [`ConnectionWeights::new`] (or `Default`), so
/// every value is non-negative, finite and has a positive sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionWeights {
    centroid: f64,
    internal: f64,
    external: f64,
}

impl Default for ConnectionWeights {
    fn default() -> Self {
        Self {
            centroid: 4.0,
            internal: 1.0,
            external: 1.0,
        }
    }
}

impl ConnectionWeights {
    /// Validates and creates a weight triple.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeights`] if any weight is negative or
    /// not finite, or if the weights sum to zero.
    pub fn new(centroid: f64, internal: f64, external: f64) -> Result<Self, ConfigError> {
        let all = [centroid, internal, external];
        let sum: f64 = all.iter().sum();
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || sum <= 0.0 {
            return Err(ConfigError::InvalidWeights {
                centroid,
                internal,
                external,
            });
        }
        Ok(Self {
            centroid,
            internal,
            external,
        })
    }

    pub fn centroid(&self) -> f64 {
        self.centroid
    }

    pub fn internal(&self) -> f64 {
        self.internal
    }

    pub fn external(&self) -> f64 {
        self.external
    }
}

/// Element assigned on export to pseudo-atoms carrying `role`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleElement {
    pub role: String,
    pub element: u8,
}

impl RoleElement {
    pub fn new(role: &str, element: u8) -> Self {
        Self {
            role: role.to_string(),
            element,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyConfig {
    pub pseudo_atom_element: u8,
    pub connection_element: u8,
    pub connection_weights: ConnectionWeights,
    /// Checked in order; the first role a pseudo-atom carries wins.
    pub role_elements: Vec<RoleElement>,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            pseudo_atom_element: DEFAULT_PSEUDO_ATOM_ELEMENT,
            connection_element: DEFAULT_CONNECTION_ELEMENT,
            connection_weights: ConnectionWeights::default(),
            role_elements: vec![RoleElement::new("node", 40), RoleElement::new("linker", 7)],
        }
    }
}

impl SimplifyConfig {
    pub fn builder() -> SimplifyConfigBuilder {
        SimplifyConfigBuilder::new()
    }

    /// Reads a TOML configuration. Keys left out keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let partial: PartialSimplifyConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        partial.into_builder()?.build()
    }

    /// Element for a pseudo-atom carrying the given roles, if any rule applies.
    pub fn element_for_roles(&self, mut has_role: impl FnMut(&str) -> bool) -> Option<u8> {
        self.role_elements
            .iter()
            .find(|rule| has_role(rule.role.as_str()))
            .map(|rule| rule.element)
    }
}

#[derive(Default)]
pub struct SimplifyConfigBuilder {
    pseudo_atom_element: Option<u8>,
    connection_element: Option<u8>,
    connection_weights: Option<ConnectionWeights>,
    role_elements: Option<Vec<RoleElement>>,
}

impl SimplifyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pseudo_atom_element(mut self, element: u8) -> Self {
        self.pseudo_atom_element = Some(element);
        self
    }
    pub fn connection_element(mut self, element: u8) -> Self {
        self.connection_element = Some(element);
        self
    }
    pub fn connection_weights(mut self, weights: ConnectionWeights) -> Self {
        self.connection_weights = Some(weights);
        self
    }
    pub fn role_elements(mut self, rules: Vec<RoleElement>) -> Self {
        self.role_elements = Some(rules);
        self
    }

    pub fn build(self) -> Result<SimplifyConfig, ConfigError> {
        let defaults = SimplifyConfig::default();
        Ok(SimplifyConfig {
            pseudo_atom_element: self
                .pseudo_atom_element
                .unwrap_or(defaults.pseudo_atom_element),
            connection_element: self
                .connection_element
                .unwrap_or(defaults.connection_element),
            connection_weights: self.connection_weights.unwrap_or(defaults.connection_weights),
            role_elements: self.role_elements.unwrap_or(defaults.role_elements),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialConnectionWeights {
    centroid: Option<f64>,
    internal: Option<f64>,
    external: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSimplifyConfig {
    #[serde(rename = "pseudo-atom-element")]
    pseudo_atom_element: Option<u8>,
    #[serde(rename = "connection-element")]
    connection_element: Option<u8>,
    #[serde(rename = "connection-weights")]
    connection_weights: Option<PartialConnectionWeights>,
    #[serde(rename = "role-elements")]
    role_elements: Option<Vec<RoleElement>>,
}

impl PartialSimplifyConfig {
    fn into_builder(self) -> Result<SimplifyConfigBuilder, ConfigError> {
        let mut builder = SimplifyConfigBuilder::new();
        if let Some(element) = self.pseudo_atom_element {
            builder = builder.pseudo_atom_element(element);
        }
        if let Some(element) = self.connection_element {
            builder = builder.connection_element(element);
        }
        if let Some(partial) = self.connection_weights {
            let defaults = ConnectionWeights::default();
            builder = builder.connection_weights(ConnectionWeights::new(
                partial.centroid.unwrap_or(defaults.centroid),
                partial.internal.unwrap_or(defaults.internal),
                partial.external.unwrap_or(defaults.external),
            )?);
        }
        if let Some(rules) = self.role_elements {
            builder = builder.role_elements(rules);
        }
        Ok(builder)
    }
}
