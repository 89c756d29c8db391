//! Dynamic result metadata.
//!
//! Runner results carry a genuinely dynamic bag of fields depending on
//! operation type (`ops`, `shards_histogram`, `http-status`, dependent
//! timings,...), so unlike the rest of the data model this is backed by
//! `serde_json::Value` rather than a fixed struct.

use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// A `dict`-shaped runner result.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Meta(Map<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_success(success: bool) -> Self {
        let mut meta = Self::new();
        meta.insert("success", Value::Bool(success));
        meta
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn success(&self) -> bool {
        self.0
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true)
    }

    pub fn weight(&self) -> Option<f64> {
        self.0.get("weight").and_then(Value::as_f64)
    }

    pub fn unit(&self) -> Option<&str> {
        self.0.get("unit").and_then(Value::as_str)
    }

    pub fn throughput_override(&self) -> Option<f64> {
        self.0.get("throughput_override").and_then(Value::as_f64)
    }

    pub fn completed(&self) -> Option<bool> {
        self.0.get("completed").and_then(Value::as_bool)
    }

    pub fn percent_completed(&self) -> Option<f64> {
        self.0.get("percent_completed").and_then(Value::as_f64)
    }

    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self.0.get(path.split('.').next()?)?;
        for segment in path.split('.').skip(1) {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

impl Deref for Meta {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Meta {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
