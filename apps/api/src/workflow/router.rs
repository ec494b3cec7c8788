//! Immutable routing table from intent label to handler.
//!
//! Built once at startup from a handler registry and shared by reference
//! with every turn. Lookups never mutate the table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::llm_client::search::SearchTool;
use crate::llm_client::StructuredLlm;
use crate::workflow::handlers::{CompanyResearcher, Enhancer, Handler, JobMatcher, Translator};
use crate::workflow::state::Intent;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no route for intent '{0}'")]
    UnknownIntent(String),

    #[error("no handler registered for intent '{0}'")]
    MissingHandler(Intent),
}

#[derive(Clone)]
pub struct Router {
    table: HashMap<&'static str, Arc<dyn Handler>>,
}

impl Router {
    /// Registers each handler under its intent label. A later handler for the
    /// same intent replaces an earlier one.
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        let table = handlers
            .into_iter()
            .map(|h| (h.intent().as_str(), h))
            .collect();
        Self { table }
    }

    /// The four standard handlers sharing one backend handle.
    pub fn standard(
        llm: StructuredLlm,
        search: Option<(Arc<dyn SearchTool>, Duration)>,
    ) -> Self {
        let mut researcher = CompanyResearcher::new(llm.clone());
        if let Some((tool, timeout)) = search {
            researcher = researcher.with_search(tool, timeout);
        }

        let router = Self::new(vec![
            Arc::new(JobMatcher::new(llm.clone())),
            Arc::new(Enhancer::new(llm.clone())),
            Arc::new(researcher),
            Arc::new(Translator::new(llm)),
        ]);
        info!("Routing table built with {} handlers", router.table.len());
        router
    }

    /// Resolves a classifier label. Labels outside the intent enum and
    /// intents with no registered handler are both errors.
    pub fn resolve(&self, label: &str) -> Result<Arc<dyn Handler>, RoutingError> {
        let intent: Intent = label
            .parse()
            .map_err(|_| RoutingError::UnknownIntent(label.to_string()))?;
        self.table
            .get(intent.as_str())
            .cloned()
            .ok_or(RoutingError::MissingHandler(intent))
    }

    /// Intents with no registered handler.
    pub fn missing(&self) -> Vec<Intent> {
        Intent::ALL
            .into_iter()
            .filter(|i| !self.table.contains_key(i.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedBackend;

    #[test]
    fn test_standard_table_is_total() {
        let router = Router::standard(ScriptedBackend::new().into_llm(), None);
        assert!(router.missing().is_empty());
        for intent in Intent::ALL {
            let handler = router.resolve(intent.as_str()).unwrap();
            assert_eq!(handler.intent(), intent);
        }
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let router = Router::standard(ScriptedBackend::new().into_llm(), None);
        let err = router.resolve("summarize").err().unwrap();
        assert!(matches!(err, RoutingError::UnknownIntent(ref l) if l == "summarize"));
    }

    #[test]
    fn test_unregistered_intent_is_an_error() {
        let llm = ScriptedBackend::new().into_llm();
        let router = Router::new(vec![Arc::new(Enhancer::new(llm))]);
        let err = router.resolve("translation").err().unwrap();
        assert!(matches!(err, RoutingError::MissingHandler(Intent::Translation)));
        assert_eq!(router.missing().len(), 3);
    }
}
