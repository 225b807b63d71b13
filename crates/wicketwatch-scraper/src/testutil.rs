//! In-memory `PageSource` fake for engine tests.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use wicketwatch_browser::{BrowserError, PageSource, Result};

/// A scriptable page: selector texts, element presence and evaluation
/// results are seeded up front and may be swapped between iterations.
/// Evaluation results are keyed by a distinguishing substring of the
/// script source.
#[derive(Default)]
pub struct FakePage {
    texts: Mutex<HashMap<String, Vec<String>>>,
    scripts: Mutex<Vec<(String, Value)>>,
    elements: Mutex<HashSet<String>>,
    clicks: Mutex<Vec<String>>,
    visited: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texts(self, selector: &str, texts: Vec<String>) -> Self {
        self.set_texts(selector, texts);
        self
    }

    pub fn with_script_result(self, script_fragment: &str, result: Value) -> Self {
        self.set_script_result(script_fragment, result);
        self
    }

    pub fn with_element(self, selector: &str) -> Self {
        self.elements
            .lock()
            .expect("lock poisoned")
            .insert(selector.to_string());
        self
    }

    pub fn set_texts(&self, selector: &str, texts: Vec<String>) {
        self.texts
            .lock()
            .expect("lock poisoned")
            .insert(selector.to_string(), texts);
    }

    pub fn set_script_result(&self, script_fragment: &str, result: Value) {
        let mut scripts = self.scripts.lock().expect("lock poisoned");
        scripts.retain(|(fragment, _)| fragment != script_fragment);
        scripts.push((script_fragment.to_string(), result));
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().expect("lock poisoned").clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl PageSource for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.visited
            .lock()
            .expect("lock poisoned")
            .push(url.to_string());
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout_ms: u64) -> Result<()> {
        if self
            .elements
            .lock()
            .expect("lock poisoned")
            .contains(selector)
        {
            Ok(())
        } else {
            Err(BrowserError::Timeout(selector.to_string()))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if self
            .elements
            .lock()
            .expect("lock poisoned")
            .contains(selector)
        {
            self.clicks
                .lock()
                .expect("lock poisoned")
                .push(selector.to_string());
            Ok(())
        } else {
            Err(BrowserError::SelectorNotFound(selector.to_string()))
        }
    }

    async fn text(&self, selector: &str) -> Result<Option<String>> {
        Ok(self
            .texts
            .lock()
            .expect("lock poisoned")
            .get(selector)
            .and_then(|texts| texts.first().cloned()))
    }

    async fn text_all(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .texts
            .lock()
            .expect("lock poisoned")
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn evaluate_json(&self, script: &str) -> Result<Value> {
        let scripts = self.scripts.lock().expect("lock poisoned");
        Ok(scripts
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(Value::Null))
    }
}
