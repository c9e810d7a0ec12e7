//! Navigation sink
//!
//! Guards and contexts never change location themselves; they ask a
//! [`Navigator`] to. The history navigator records every request.

use std::sync::Mutex;
use tracing::debug;

/// Something that can move the user to another route
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Navigator that records requested locations
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All redirects so far, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// How many redirects went to `path`
    pub fn count_to(&self, path: &str) -> usize {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    pub fn len(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Navigator for HistoryNavigator {
    fn redirect(&self, path: &str) {
        debug!(path, "Navigate");
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history() {
        let nav = HistoryNavigator::new();
        assert!(nav.is_empty());
        nav.redirect("/login");
        nav.redirect("/company/select-plan");
        nav.redirect("/login");
        assert_eq!(nav.len(), 3);
        assert_eq!(nav.count_to("/login"), 2);
        assert_eq!(nav.last().as_deref(), Some("/login"));
    }
}
