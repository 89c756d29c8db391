//! Request parameters produced by a [`crate::param_source::ParamSource`] and
//! consumed by a runner (and the wrappers decorating it).

use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// One request's worth of parameters, as produced by a parameter source and
/// handed to a runner. Dynamic by nature: every operation type reads a
/// different subset of keys.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// `retries` (default 0).
    pub fn retries(&self) -> u64 {
        self.get_u64("retries").unwrap_or(0)
    }

    /// `retry-until-success` (default false).
    pub fn retry_until_success(&self) -> bool {
        self.get_bool_or("retry-until-success", false)
    }

    /// `retry-wait-period` seconds (default 0.5).
    pub fn retry_wait_period(&self) -> f64 {
        self.get_f64("retry-wait-period").unwrap_or(0.5)
    }

    /// `retry-on-timeout` (default true).
    pub fn retry_on_timeout(&self) -> bool {
        self.get_bool_or("retry-on-timeout", true)
    }

    /// `retry-on-error` (default false).
    pub fn retry_on_error(&self) -> bool {
        self.get_bool_or("retry-on-error", false)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn assertions(&self) -> Option<&Vec<Value>> {
        self.0.get("assertions").and_then(Value::as_array)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Deref for Params {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Params {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
