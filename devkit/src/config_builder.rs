/*!
Builders for user configuration layers

Produces the JSON document a user would write to `config.json`, so tests
read as the configuration they exercise.
*/

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    values: Map<String, Value>,
    stack: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a widget to the stack with its settings map.
    pub fn widget(mut self, name: &str, spec: Value) -> Self {
        self.stack.push(name.to_string());
        self.values.insert(name.to_string(), spec);
        self
    }

    /// Append a stub widget of the given height.
    pub fn stub(self, name: &str, height: i64) -> Self {
        self.widget(name, json!({"widget": crate::STUB_KIND, "height": height}))
    }

    pub fn debug(self, enabled: bool) -> Self {
        self.set("debug", Value::Bool(enabled))
    }

    /// Any top-level key: theme colors, `logfile`, `conky`, host overrides.
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Patch applied only on `hostname`.
    pub fn host(self, hostname: &str, patch: Value) -> Self {
        let key = format!("[{hostname}]");
        self.set(&key, patch)
    }

    pub fn build(self) -> Value {
        let mut values = self.values;
        if !self.stack.is_empty() {
            values.insert("widgets".to_string(), json!(self.stack));
        }
        Value::Object(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_stack_order() {
        let config = ConfigBuilder::new()
            .stub("a", 10)
            .widget("clock", json!({"widget": "clock"}))
            .debug(true)
            .host("desk", json!({"debug": false}))
            .build();
        assert_eq!(config["widgets"], json!(["a", "clock"]));
        assert_eq!(config["a"], json!({"widget": "stub", "height": 10}));
        assert_eq!(config["[desk]"], json!({"debug": false}));
        assert_eq!(config["debug"], json!(true));
    }

    #[test]
    fn test_empty_builder_leaves_widgets_to_defaults() {
        assert!(ConfigBuilder::new().build().get("widgets").is_none());
    }
}
