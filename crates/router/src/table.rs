//! Declarative route table: ordered entries plus a not-found fallback.

use std::{fmt, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::OnceCell;

use crate::{
    guard::RouteGuard,
    pattern::{PathPattern, PatternError, RouteParams},
    slices::StateSlice,
};

pub(crate) type ViewResolver<V> =
    Arc<dyn Fn(RouteParams) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;
pub(crate) type TableLoader<V> =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<RouteTable<V>>> + Send + Sync>;

pub(crate) enum RouteTarget<V> {
    Component(V),
    Lazy(ViewResolver<V>),
    Children {
        load: TableLoader<V>,
        loaded: OnceCell<RouteTable<V>>,
    },
}

/// One row of the table, before its pattern is compiled.
pub struct RouteEntry<V> {
    pattern: String,
    pub(crate) target: RouteTarget<V>,
    pub(crate) guards: Vec<Arc<dyn RouteGuard>>,
    pub(crate) slices: Vec<Arc<dyn StateSlice>>,
    pub(crate) title: Option<String>,
}

impl<V: Send + 'static> RouteEntry<V> {
    /// Route whose view is known up front.
    pub fn component(pattern: impl Into<String>, view: V) -> Self {
        Self::with_target(pattern.into(), RouteTarget::Component(view))
    }

    /// Route whose view is produced on activation.
    pub fn lazy<F, Fut>(pattern: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let resolve: ViewResolver<V> = Arc::new(move |params| resolve(params).boxed());
        Self::with_target(pattern.into(), RouteTarget::Lazy(resolve))
    }

    /// Route that owns a nested table, loaded the first time a navigation
    /// gets past this entry's guards.
    pub fn children<F, Fut>(pattern: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<RouteTable<V>>> + Send + 'static,
    {
        let load: TableLoader<V> = Arc::new(move || load().boxed());
        Self::with_target(
            pattern.into(),
            RouteTarget::Children {
                load,
                loaded: OnceCell::new(),
            },
        )
    }
}

impl<V> RouteEntry<V> {
    fn with_target(pattern: String, target: RouteTarget<V>) -> Self {
        Self {
            pattern,
            target,
            guards: Vec::new(),
            slices: Vec::new(),
            title: None,
        }
    }

    /// Appends a guard. Guards run in the order they were added.
    pub fn guard(mut self, guard: Arc<dyn RouteGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn slice(mut self, slice: Arc<dyn StateSlice>) -> Self {
        self.slices.push(slice);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn compile(self) -> Result<Route<V>, PatternError> {
        Ok(Route {
            pattern: PathPattern::parse(&self.pattern)?,
            entry: self,
        })
    }
}

impl<V> fmt::Debug for RouteEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target {
            RouteTarget::Component(_) => "component",
            RouteTarget::Lazy(_) => "lazy",
            RouteTarget::Children { .. } => "children",
        };
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("kind", &kind)
            .field("guards", &self.guards.len())
            .field("slices", &self.slices.len())
            .field("title", &self.title)
            .finish()
    }
}

pub(crate) struct Route<V> {
    pub(crate) pattern: PathPattern,
    pub(crate) entry: RouteEntry<V>,
}

impl<V> Route<V> {
    fn is_parent(&self) -> bool {
        matches!(self.entry.target, RouteTarget::Children { .. })
    }
}

/// Result of resolving a path against one table.
pub(crate) struct Matched<'a, V> {
    pub(crate) route: &'a Route<V>,
    pub(crate) params: RouteParams,
    pub(crate) consumed: usize,
    pub(crate) not_found: bool,
}

pub struct RouteTable<V> {
    routes: Vec<Route<V>>,
    fallback: Option<Box<Route<V>>>,
}

impl<V> RouteTable<V> {
    pub fn builder() -> RouteTableBuilder<V> {
        RouteTableBuilder {
            entries: Vec::new(),
            fallback: None,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Patterns in declaration order, fallback excluded.
    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.pattern.as_str()).collect()
    }

    /// Picks the most specific entry matching `segments`, earliest
    /// declaration winning ties. Parent entries only need to match a prefix.
    /// Falls back to the not-found entry when nothing matches.
    pub(crate) fn resolve(&self, segments: &[String]) -> Option<Matched<'_, V>> {
        let mut best: Option<Matched<'_, V>> = None;
        for route in &self.routes {
            let found = if route.is_parent() {
                route.pattern.match_prefix(segments)
            } else {
                route
                    .pattern
                    .match_full(segments)
                    .map(|params| (params, segments.len()))
            };
            let Some((params, consumed)) = found else {
                continue;
            };
            let better = best.as_ref().map_or(true, |current| {
                route.pattern.specificity() > current.route.pattern.specificity()
            });
            if better {
                best = Some(Matched {
                    route,
                    params,
                    consumed,
                    not_found: false,
                });
            }
        }
        best.or_else(|| self.not_found(segments))
    }

    pub(crate) fn not_found(&self, segments: &[String]) -> Option<Matched<'_, V>> {
        self.fallback.as_deref().map(|route| Matched {
            route,
            params: RouteParams::new(),
            consumed: segments.len(),
            not_found: true,
        })
    }
}

impl<V> fmt::Debug for RouteTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("patterns", &self.patterns())
            .field("fallback", &self.has_fallback())
            .finish()
    }
}

pub struct RouteTableBuilder<V> {
    entries: Vec<RouteEntry<V>>,
    fallback: Option<RouteEntry<V>>,
}

impl<V> RouteTableBuilder<V> {
    pub fn route(mut self, entry: RouteEntry<V>) -> Self {
        self.entries.push(entry);
        self
    }

    /// Entry used when no other route matches. Its pattern is kept for
    /// reporting only.
    pub fn not_found(mut self, entry: RouteEntry<V>) -> Self {
        self.fallback = Some(entry);
        self
    }

    pub fn build(self) -> Result<RouteTable<V>, PatternError> {
        let routes = self
            .entries
            .into_iter()
            .map(RouteEntry::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let fallback = self
            .fallback
            .map(RouteEntry::compile)
            .transpose()?
            .map(Box::new);
        Ok(RouteTable { routes, fallback })
    }
}
