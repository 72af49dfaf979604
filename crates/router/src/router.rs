use std::sync::Arc;

use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    guard::{GuardDecision, NavigationRequest},
    pattern::{split_path, RouteParams},
    slices::{SliceScope, StateRegistry, StateSlice},
    table::{Matched, Route, RouteTable, RouteTarget, ViewResolver},
};

const NAVIGATION_BASE: &str = "http://storefront.local/";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("invalid navigation path {path:?}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to load the view for {path}")]
    ViewLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to load the child routes of {pattern:?}")]
    ChildLoad {
        pattern: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("route table has no not-found entry")]
    MissingFallback,
}

/// What is known about an activated route, without its view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    /// Normalized path including the query string.
    pub path: String,
    /// Patterns of the matched chain joined with `/`.
    pub pattern: String,
    pub title: Option<String>,
    pub params: RouteParams,
    pub not_found: bool,
}

#[derive(Debug, Clone)]
pub struct ActivatedRoute<V> {
    pub route: RouteSnapshot,
    pub view: V,
}

#[derive(Debug, Clone)]
pub enum NavigationOutcome<V> {
    Activated(ActivatedRoute<V>),
    /// A guard refused. Nothing was resolved and the previous route is
    /// still active.
    Denied {
        path: String,
        guard: String,
        redirect: Option<String>,
    },
}

impl<V> NavigationOutcome<V> {
    pub fn activated(self) -> Option<ActivatedRoute<V>> {
        match self {
            NavigationOutcome::Activated(route) => Some(route),
            NavigationOutcome::Denied { .. } => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, NavigationOutcome::Denied { .. })
    }
}

struct ActiveRoute {
    snapshot: RouteSnapshot,
    _slices: SliceScope,
}

enum Leaf<'a, V> {
    Ready(&'a V),
    Deferred(&'a ViewResolver<V>),
}

struct Target {
    path: String,
    segments: Vec<String>,
    query: RouteParams,
}

/// Resolves paths against a [`RouteTable`] and keeps track of the active
/// route. Navigations are serialized.
pub struct Router<V> {
    table: RouteTable<V>,
    registry: StateRegistry,
    active: Mutex<Option<ActiveRoute>>,
}

impl<V: Clone + Send + Sync + 'static> Router<V> {
    pub fn new(table: RouteTable<V>) -> Result<Self, NavigationError> {
        if !table.has_fallback() {
            return Err(NavigationError::MissingFallback);
        }
        Ok(Self {
            table,
            registry: StateRegistry::new(),
            active: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn table(&self) -> &RouteTable<V> {
        &self.table
    }

    pub async fn active(&self) -> Option<RouteSnapshot> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|route| route.snapshot.clone())
    }

    pub async fn navigate(&self, path: &str) -> Result<NavigationOutcome<V>, NavigationError> {
        let target = parse_target(path)?;
        let mut active = self.active.lock().await;
        let from = active.as_ref().map(|route| route.snapshot.path.clone());

        let mut table = &self.table;
        let mut rest: &[String] = &target.segments;
        let mut params = target.query.clone();
        let mut chain: Vec<&Route<V>> = Vec::new();
        let mut not_found = false;

        let leaf = loop {
            let matched = match table.resolve(rest) {
                Some(matched) => matched,
                None => {
                    // nested table without a fallback of its own
                    chain.clear();
                    self.table
                        .not_found(&target.segments)
                        .ok_or(NavigationError::MissingFallback)?
                }
            };
            let Matched {
                route,
                params: found,
                consumed,
                not_found: fallback,
            } = matched;
            not_found |= fallback;
            params.extend(found);

            let request = NavigationRequest {
                path: target.path.clone(),
                from: from.clone(),
                params: params.clone(),
            };
            if let Some((guard, decision)) = check_guards(route, &request).await {
                info!(path = %target.path, %guard, "navigation denied");
                let redirect = match decision {
                    GuardDecision::Redirect(redirect) => Some(redirect),
                    _ => None,
                };
                return Ok(NavigationOutcome::Denied {
                    path: target.path,
                    guard,
                    redirect,
                });
            }
            chain.push(route);

            match &route.entry.target {
                RouteTarget::Component(view) => break Leaf::Ready(view),
                RouteTarget::Lazy(resolve) => break Leaf::Deferred(resolve),
                RouteTarget::Children { load, loaded } => {
                    table = loaded
                        .get_or_try_init(|| async {
                            let children = load().await?;
                            debug!(
                                pattern = route.pattern.as_str(),
                                routes = children.len(),
                                "child routes loaded"
                            );
                            Ok::<_, anyhow::Error>(children)
                        })
                        .await
                        .map_err(|source| NavigationError::ChildLoad {
                            pattern: route.pattern.as_str().to_string(),
                            source,
                        })?;
                    rest = &rest[consumed..];
                }
            }
        };

        if let Some(previous) = active.take() {
            debug!(path = %previous.snapshot.path, "route deactivated");
        }
        let slices: Vec<Arc<dyn StateSlice>> = chain
            .iter()
            .flat_map(|route| route.entry.slices.iter().cloned())
            .collect();
        let scope = self.registry.install(&slices);

        let view = match leaf {
            Leaf::Ready(view) => view.clone(),
            Leaf::Deferred(resolve) => match resolve(params.clone()).await {
                Ok(view) => view,
                Err(source) => {
                    warn!(path = %target.path, error = %source, "view failed to load");
                    return Err(NavigationError::ViewLoad {
                        path: target.path,
                        source,
                    });
                }
            },
        };

        let snapshot = RouteSnapshot {
            path: target.path,
            pattern: chain
                .iter()
                .map(|route| route.pattern.as_str())
                .filter(|pattern| !pattern.is_empty())
                .collect::<Vec<_>>()
                .join("/"),
            title: chain.iter().rev().find_map(|route| route.entry.title.clone()),
            params,
            not_found,
        };
        info!(path = %snapshot.path, pattern = %snapshot.pattern, not_found, "route activated");
        *active = Some(ActiveRoute {
            snapshot: snapshot.clone(),
            _slices: scope,
        });

        Ok(NavigationOutcome::Activated(ActivatedRoute {
            route: snapshot,
            view,
        }))
    }
}

async fn check_guards<V>(
    route: &Route<V>,
    request: &NavigationRequest,
) -> Option<(String, GuardDecision)> {
    for guard in &route.entry.guards {
        let decision = guard.check(request).await;
        if !decision.is_allowed() {
            return Some((guard.name().to_string(), decision));
        }
    }
    None
}

fn parse_target(path: &str) -> Result<Target, NavigationError> {
    // a leading `//` would otherwise be read as a host
    let rooted = format!("/{}", path.trim_start_matches(['/', '\\']));
    let url = Url::parse(NAVIGATION_BASE)
        .and_then(|base| base.join(&rooted))
        .map_err(|source| NavigationError::InvalidPath {
            path: path.to_string(),
            source,
        })?;

    let mut query = RouteParams::new();
    for (name, value) in url.query_pairs() {
        query.insert_query(name, value);
    }
    let normalized = match url.query() {
        Some(raw) => format!("{}?{raw}", url.path()),
        None => url.path().to_string(),
    };

    Ok(Target {
        segments: split_path(url.path())
            .into_iter()
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect(),
        path: normalized,
        query,
    })
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
