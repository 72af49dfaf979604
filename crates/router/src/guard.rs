//! Authorization predicates evaluated before a route activates.

use async_trait::async_trait;

use crate::pattern::RouteParams;

/// What a guard sees about the navigation being attempted.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    /// Normalized target path, including the query string.
    pub path: String,
    /// Path of the route active before this navigation, if any.
    pub from: Option<String>,
    pub params: RouteParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny,
    /// Deny and suggest another path. The router reports it but does not
    /// follow it.
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

#[async_trait]
pub trait RouteGuard: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, request: &NavigationRequest) -> GuardDecision;
}

/// Guard backed by a synchronous closure.
pub struct FnGuard<F> {
    name: String,
    check: F,
}

impl<F> FnGuard<F>
where
    F: Fn(&NavigationRequest) -> GuardDecision + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> RouteGuard for FnGuard<F>
where
    F: Fn(&NavigationRequest) -> GuardDecision + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, request: &NavigationRequest) -> GuardDecision {
        (self.check)(request)
    }
}
