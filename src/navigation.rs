// 🧭 Navigation - ask a router to move to a path
//
// The router owns navigation state. `Navigator` only forwards one request
// per call and waits for the router to commit (or reject) it. Router
// failures reach the caller untouched.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// Something that can commit a transition to a path
#[async_trait]
pub trait Router: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Request a transition; resolves once the router has committed or rejected it
    async fn push(&self, path: &str) -> Result<(), Self::Error>;
}

/// Thin handle over a router
pub struct Navigator<R: Router> {
    router: R,
}

impl<R: Router> Navigator<R> {
    pub fn new(router: R) -> Self {
        Navigator { router }
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Navigate to `path`, suspending until the router resolves the transition
    pub async fn navigate_to(&self, path: &str) -> Result<(), R::Error> {
        debug!(path, "navigation requested");
        self.router.push(path).await?;
        debug!(path, "navigation committed");
        Ok(())
    }
}

// ============================================================================
// HISTORY ROUTER
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation path is empty")]
    EmptyPath,

    #[error("no route matches {0:?}")]
    UnknownRoute(String),

    #[error("router state is unavailable")]
    Poisoned,
}

pub const ROOT_ROUTE: &str = "/";

/// In-process router: a route table plus a history stack
///
/// Patterns are `/`-separated; a `:name` segment matches any single segment.
pub struct HistoryRouter {
    routes: Vec<String>,
    history: Mutex<Vec<String>>,
}

impl HistoryRouter {
    pub fn new<I, S>(routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HistoryRouter {
            routes: routes.into_iter().map(Into::into).collect(),
            history: Mutex::new(vec![ROOT_ROUTE.to_string()]),
        }
    }

    pub fn knows(&self, path: &str) -> bool {
        path == ROOT_ROUTE || self.routes.iter().any(|pattern| route_matches(pattern, path))
    }

    /// Path currently shown
    pub fn current(&self) -> String {
        self.lock()
            .ok()
            .and_then(|history| history.last().cloned())
            .unwrap_or_else(|| ROOT_ROUTE.to_string())
    }

    /// Go back one step; the root entry is never popped
    pub fn back(&self) -> Result<String, NavigationError> {
        let mut history = self.lock()?;
        if history.len() > 1 {
            history.pop();
        }
        Ok(history.last().cloned().unwrap_or_else(|| ROOT_ROUTE.to_string()))
    }

    pub fn depth(&self) -> usize {
        self.lock().map(|history| history.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<String>>, NavigationError> {
        self.history.lock().map_err(|_| NavigationError::Poisoned)
    }
}

#[async_trait]
impl Router for HistoryRouter {
    type Error = NavigationError;

    async fn push(&self, path: &str) -> Result<(), NavigationError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(NavigationError::EmptyPath);
        }
        if !self.knows(path) {
            return Err(NavigationError::UnknownRoute(path.to_string()));
        }

        let mut history = self.lock()?;
        // Pushing the page already on top is a no-op
        if history.last().map(String::as_str) != Some(path) {
            history.push(path.to_string());
        }
        Ok(())
    }
}

fn route_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path: Vec<&str> = path.trim_matches('/').split('/').collect();

    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| (p.starts_with(':') && !s.is_empty()) || p == s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Router that records requests and holds each one until released
    struct GatedRouter {
        requests: Mutex<Vec<String>>,
        gate: Notify,
        reject: bool,
    }

    impl GatedRouter {
        fn new(reject: bool) -> Self {
            GatedRouter {
                requests: Mutex::new(Vec::new()),
                gate: Notify::new(),
                reject,
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Router for GatedRouter {
        type Error = NavigationError;

        async fn push(&self, path: &str) -> Result<(), NavigationError> {
            self.requests.lock().unwrap().push(path.to_string());
            self.gate.notified().await;
            if self.reject {
                Err(NavigationError::UnknownRoute(path.to_string()))
            } else {
                Ok(())
            }
        }
    }

    async fn wait_for_request(navigator: &Navigator<GatedRouter>) {
        while navigator.router().requests().is_empty() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_navigate_waits_for_router() {
        let navigator = Arc::new(Navigator::new(GatedRouter::new(false)));

        let task = {
            let navigator = Arc::clone(&navigator);
            tokio::spawn(async move { navigator.navigate_to("/clients/7").await })
        };

        wait_for_request(&navigator).await;
        assert!(!task.is_finished());

        navigator.router().gate.notify_one();
        task.await.unwrap().unwrap();

        assert_eq!(navigator.router().requests(), vec!["/clients/7".to_string()]);
    }

    #[tokio::test]
    async fn test_router_failure_propagates_unchanged() {
        let navigator = Arc::new(Navigator::new(GatedRouter::new(true)));

        let task = {
            let navigator = Arc::clone(&navigator);
            tokio::spawn(async move { navigator.navigate_to("/nowhere").await })
        };

        wait_for_request(&navigator).await;
        navigator.router().gate.notify_one();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, NavigationError::UnknownRoute("/nowhere".to_string()));
        assert_eq!(navigator.router().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_history_router_push_and_back() {
        let navigator = Navigator::new(HistoryRouter::new(["/clients", "/purchases/:id"]));
        assert_eq!(navigator.router().current(), "/");

        navigator.navigate_to("/clients").await.unwrap();
        navigator.navigate_to("/purchases/12").await.unwrap();
        navigator.navigate_to("/purchases/12").await.unwrap();
        assert_eq!(navigator.router().current(), "/purchases/12");
        assert_eq!(navigator.router().depth(), 3);

        assert_eq!(navigator.router().back().unwrap(), "/clients");
        assert_eq!(navigator.router().back().unwrap(), "/");
        assert_eq!(navigator.router().back().unwrap(), "/");
    }

    #[tokio::test]
    async fn test_history_router_rejects_unknown_paths() {
        let navigator = Navigator::new(HistoryRouter::new(["/clients"]));

        assert_eq!(
            navigator.navigate_to("").await.unwrap_err(),
            NavigationError::EmptyPath
        );
        assert_eq!(
            navigator.navigate_to("/clients/1/extra").await.unwrap_err(),
            NavigationError::UnknownRoute("/clients/1/extra".to_string())
        );
        assert_eq!(navigator.router().current(), "/");
    }

    #[test]
    fn test_route_patterns() {
        assert!(route_matches("/purchases/:id", "/purchases/3"));
        assert!(route_matches("/clients", "/clients/"));
        assert!(!route_matches("/purchases/:id", "/purchases"));
        assert!(!route_matches("/purchases/:id", "/payments/3"));
    }
}
