//! Configuration file loading for extension categories.
//!
//! # Responsibility
//! - Resolve a named configuration resource and parse it as one JSON object.
//! - Populate a category's configuration template from its own subtree.
//!
//! # Invariants
//! - The template is populated in place; callers keep the same value slot.
//! - A root object without the category key leaves the template untouched.
//! - Every failure is reported as `ConfigReadError` carrying the file name.

use crate::config::resources::ResourceResolver;
use crate::extension::category::CategoryConfiguration;
use log::debug;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, BufReader};

/// Whether the category's subtree was present in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Populated,
    Absent,
}

/// Loads category configurations from a host resource resolver.
#[derive(Clone, Copy)]
pub struct ConfigurationLoader<'a> {
    resources: &'a dyn ResourceResolver,
}

impl<'a> ConfigurationLoader<'a> {
    pub fn new(resources: &'a dyn ResourceResolver) -> Self {
        Self { resources }
    }

    /// Populates `template` from the subtree keyed by its category type.
    ///
    /// # Errors
    /// - `ResourceNotFound` when the resource does not exist.
    /// - `Unreadable` when the resource cannot be read as UTF-8 text.
    /// - `MalformedJson` when the content is not a JSON object.
    /// - `InvalidSection` when the subtree is not an object or does not fit
    ///   the template.
    pub fn load(
        &self,
        config_file_name: &str,
        template: &mut dyn CategoryConfiguration,
    ) -> Result<SectionState, ConfigReadError> {
        let document = self.read_document(config_file_name)?;
        let category_key = template.category_type().to_string();

        let Some(section) = document.get(category_key.as_str()) else {
            debug!(
                "event=config_load module=config status=absent file={} category={}",
                config_file_name, category_key
            );
            return Ok(SectionState::Absent);
        };
        if !section.is_object() {
            return Err(ConfigReadError::new(
                config_file_name,
                ConfigReadCause::InvalidSection {
                    category_type: category_key,
                    source: None,
                },
            ));
        }

        template.populate_from_json(section).map_err(|err| {
            ConfigReadError::new(
                config_file_name,
                ConfigReadCause::InvalidSection {
                    category_type: category_key.clone(),
                    source: Some(err),
                },
            )
        })?;
        debug!(
            "event=config_load module=config status=ok file={} category={}",
            config_file_name, category_key
        );
        Ok(SectionState::Populated)
    }

    /// Reads and parses the whole resource as a JSON object.
    pub fn read_document(&self, config_file_name: &str) -> Result<Map<String, Value>, ConfigReadError> {
        let reader = self.resources.open(config_file_name).map_err(|err| {
            let cause = if err.kind() == io::ErrorKind::NotFound {
                ConfigReadCause::ResourceNotFound
            } else {
                ConfigReadCause::Unreadable(err)
            };
            ConfigReadError::new(config_file_name, cause)
        })?;

        let text = concat_lines(BufReader::new(reader))
            .map_err(|err| ConfigReadError::new(config_file_name, ConfigReadCause::Unreadable(err)))?;

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => Err(ConfigReadError::new(
                config_file_name,
                ConfigReadCause::NotAnObject,
            )),
            Err(err) => Err(ConfigReadError::new(
                config_file_name,
                ConfigReadCause::MalformedJson(err),
            )),
        }
    }
}

/// Joins all lines with their terminators removed.
fn concat_lines(reader: impl BufRead) -> io::Result<String> {
    let mut text = String::new();
    for line in reader.lines() {
        text.push_str(&line?);
    }
    Ok(text)
}

/// Underlying reason a configuration resource could not be applied.
#[derive(Debug)]
pub enum ConfigReadCause {
    ResourceNotFound,
    Unreadable(io::Error),
    MalformedJson(serde_json::Error),
    NotAnObject,
    InvalidSection {
        category_type: String,
        source: Option<serde_json::Error>,
    },
}

impl Display for ConfigReadCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceNotFound => write!(f, "resource not found"),
            Self::Unreadable(err) => write!(f, "resource is unreadable: {err}"),
            Self::MalformedJson(err) => write!(f, "malformed JSON: {err}"),
            Self::NotAnObject => write!(f, "malformed JSON: root value must be an object"),
            Self::InvalidSection {
                category_type,
                source: Some(err),
            } => write!(f, "section `{category_type}` is invalid: {err}"),
            Self::InvalidSection {
                category_type,
                source: None,
            } => write!(f, "section `{category_type}` must be a JSON object"),
        }
    }
}

impl Error for ConfigReadCause {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable(err) => Some(err),
            Self::MalformedJson(err) => Some(err),
            Self::InvalidSection {
                source: Some(err), ..
            } => Some(err),
            Self::ResourceNotFound | Self::NotAnObject | Self::InvalidSection { .. } => None,
        }
    }
}

/// Failure to read one configuration file, reported per extension.
#[derive(Debug)]
pub struct ConfigReadError {
    file_name: String,
    cause: ConfigReadCause,
}

impl ConfigReadError {
    pub fn new(file_name: impl Into<String>, cause: ConfigReadCause) -> Self {
        Self {
            file_name: file_name.into(),
            cause,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn cause(&self) -> &ConfigReadCause {
        &self.cause
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, ConfigReadCause::ResourceNotFound)
    }

    pub fn is_malformed_json(&self) -> bool {
        matches!(
            self.cause,
            ConfigReadCause::MalformedJson(_) | ConfigReadCause::NotAnObject
        )
    }

    /// Stable short code for log events.
    pub fn code(&self) -> &'static str {
        match self.cause {
            ConfigReadCause::ResourceNotFound => "resource_not_found",
            ConfigReadCause::Unreadable(_) => "resource_unreadable",
            ConfigReadCause::MalformedJson(_) | ConfigReadCause::NotAnObject => "malformed_json",
            ConfigReadCause::InvalidSection { .. } => "invalid_section",
        }
    }
}

impl Display for ConfigReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "configuration file `{}` could not be read: {}",
            self.file_name, self.cause
        )
    }
}

impl Error for ConfigReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}
