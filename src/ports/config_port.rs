//! Configuration access port trait.
//!
//! Implementations only need to supply raw strings; typed lookups parse strictly so a
//! malformed value is reported instead of silently replaced by a default.

use crate::domain::error::PipelineError;
use std::fmt::Display;
use std::str::FromStr;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Present and non-blank value, trimmed.
    fn get_value(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, PipelineError> {
        parse_value(self.get_value(section, key), section, key)
    }

    fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>, PipelineError> {
        parse_value(self.get_value(section, key), section, key)
    }

    fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>, PipelineError> {
        parse_value(self.get_value(section, key), section, key)
    }
}

fn parse_value<T>(raw: Option<String>, section: &str, key: &str) -> Result<Option<T>, PipelineError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|s| {
        s.parse::<T>().map_err(|e| PipelineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{s:?}: {e}"),
        })
    })
    .transpose()
}
