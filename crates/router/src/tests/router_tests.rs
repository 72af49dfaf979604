use super::*;
use crate::{
    guard::{FnGuard, RouteGuard},
    slices::SliceProvider,
    table::RouteEntry,
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex as StdMutex,
};

#[derive(Debug, Clone, PartialEq)]
enum View {
    Home,
    NewBook,
    Details(String),
    BookForm(String),
    Manage,
    Checkout,
    NotFound,
}

#[derive(Debug, Default, PartialEq)]
struct SimilarBooks(Vec<i64>);

fn allow_when(flag: Arc<AtomicBool>, name: &str) -> Arc<dyn RouteGuard> {
    Arc::new(FnGuard::new(name, move |request: &NavigationRequest| {
        if flag.load(Ordering::SeqCst) {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(format!("/login?returnUrl={}", request.path))
        }
    }))
}

fn recording_guard(name: &'static str, log: Arc<StdMutex<Vec<&'static str>>>) -> Arc<dyn RouteGuard> {
    Arc::new(FnGuard::new(name, move |_: &NavigationRequest| {
        log.lock().expect("log").push(name);
        GuardDecision::Allow
    }))
}

fn deny(name: &str) -> Arc<dyn RouteGuard> {
    Arc::new(FnGuard::new(name, |_: &NavigationRequest| GuardDecision::Deny))
}

fn storefront(resolves: Arc<AtomicUsize>) -> RouteTable<View> {
    RouteTable::builder()
        .route(RouteEntry::component("", View::Home).title("Home"))
        .route(RouteEntry::component("books/new", View::NewBook))
        .route(
            RouteEntry::lazy("books/details/:id", move |params: RouteParams| {
                let resolves = Arc::clone(&resolves);
                async move {
                    resolves.fetch_add(1, Ordering::SeqCst);
                    Ok(View::Details(params.get("id").unwrap_or_default().to_string()))
                }
            })
            .slice(Arc::new(SliceProvider::new(
                "similarBooks",
                SimilarBooks::default,
            ))),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table")
}

fn activated(outcome: NavigationOutcome<View>) -> ActivatedRoute<View> {
    match outcome {
        NavigationOutcome::Activated(route) => route,
        NavigationOutcome::Denied { guard, .. } => panic!("denied by {guard}"),
    }
}

#[test]
fn router_requires_a_fallback() {
    let table = RouteTable::builder()
        .route(RouteEntry::component("", View::Home))
        .build()
        .expect("table");
    assert!(matches!(
        Router::new(table),
        Err(NavigationError::MissingFallback)
    ));
}

#[tokio::test]
async fn unregistered_path_resolves_to_not_found() {
    let router = Router::new(storefront(Arc::default())).expect("router");

    let route = activated(router.navigate("/no/such/page").await.expect("navigate"));
    assert_eq!(route.view, View::NotFound);
    assert!(route.route.not_found);
    assert_eq!(route.route.pattern, "**");
}

#[tokio::test]
async fn root_path_activates_home() {
    let router = Router::new(storefront(Arc::default())).expect("router");

    let route = activated(router.navigate("/").await.expect("navigate"));
    assert_eq!(route.view, View::Home);
    assert_eq!(route.route.title.as_deref(), Some("Home"));
    assert_eq!(route.route.pattern, "");
}

#[tokio::test]
async fn static_segment_beats_parameter() {
    let table = RouteTable::builder()
        .route(RouteEntry::lazy("books/:id", |params: RouteParams| async move {
            Ok(View::BookForm(params.get("id").unwrap_or_default().to_string()))
        }))
        .route(RouteEntry::component("books/new", View::NewBook))
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    let route = activated(router.navigate("/books/new").await.expect("navigate"));
    assert_eq!(route.view, View::NewBook);
    let route = activated(router.navigate("/books/7").await.expect("navigate"));
    assert_eq!(route.view, View::BookForm("7".into()));
}

#[tokio::test]
async fn exposes_path_and_query_params() {
    let resolves = Arc::new(AtomicUsize::new(0));
    let router = Router::new(storefront(Arc::clone(&resolves))).expect("router");

    let route = activated(
        router
            .navigate("books/details/42?tab=reviews")
            .await
            .expect("navigate"),
    );
    assert_eq!(route.view, View::Details("42".into()));
    assert_eq!(route.route.path, "/books/details/42?tab=reviews");
    assert_eq!(route.route.params.get("id"), Some("42"));
    assert_eq!(route.route.params.query("tab"), Some("reviews"));
    assert_eq!(resolves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lazy_view_resolves_once_per_navigation() {
    let resolves = Arc::new(AtomicUsize::new(0));
    let router = Router::new(storefront(Arc::clone(&resolves))).expect("router");

    router.navigate("/").await.expect("home");
    assert_eq!(resolves.load(Ordering::SeqCst), 0);

    router.navigate("/books/details/1").await.expect("first");
    router.navigate("/books/details/2").await.expect("second");
    assert_eq!(resolves.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn denied_guard_never_resolves_the_view() {
    let resolves = Arc::new(AtomicUsize::new(0));
    let signed_in = Arc::new(AtomicBool::new(false));
    let counter = Arc::clone(&resolves);
    let table = RouteTable::builder()
        .route(RouteEntry::component("", View::Home))
        .route(
            RouteEntry::lazy("checkout", move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(View::Checkout)
                }
            })
            .guard(allow_when(Arc::clone(&signed_in), "auth")),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");
    router.navigate("/").await.expect("home");

    let outcome = router.navigate("/checkout").await.expect("navigate");
    match outcome {
        NavigationOutcome::Denied {
            path,
            guard,
            redirect,
        } => {
            assert_eq!(path, "/checkout");
            assert_eq!(guard, "auth");
            assert_eq!(redirect.as_deref(), Some("/login?returnUrl=/checkout"));
        }
        NavigationOutcome::Activated(route) => panic!("activated {route:?}"),
    }
    assert_eq!(resolves.load(Ordering::SeqCst), 0);
    assert_eq!(router.active().await.map(|route| route.path), Some("/".into()));

    signed_in.store(true, Ordering::SeqCst);
    let route = activated(router.navigate("/checkout").await.expect("navigate"));
    assert_eq!(route.view, View::Checkout);
    assert_eq!(resolves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn guards_run_in_order_and_stop_at_first_denial() {
    let log = Arc::new(StdMutex::new(Vec::new()));
    let table = RouteTable::builder()
        .route(
            RouteEntry::component("wishlist", View::Home)
                .guard(recording_guard("first", Arc::clone(&log)))
                .guard(deny("blocker"))
                .guard(recording_guard("never", Arc::clone(&log))),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    let outcome = router.navigate("/wishlist").await.expect("navigate");
    assert!(outcome.is_denied());
    assert_eq!(*log.lock().expect("log"), vec!["first"]);
    assert!(router.active().await.is_none());
}

#[tokio::test]
async fn child_table_loads_once_behind_parent_guard() {
    let loads = Arc::new(AtomicUsize::new(0));
    let is_admin = Arc::new(AtomicBool::new(false));
    let counter = Arc::clone(&loads);
    let table = RouteTable::builder()
        .route(
            RouteEntry::children("admin/books", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    RouteTable::builder()
                        .route(RouteEntry::component("", View::Manage).title("Manage books"))
                        .route(RouteEntry::component("new", View::NewBook))
                        .route(RouteEntry::lazy(":id", |params: RouteParams| async move {
                            Ok(View::BookForm(params.get("id").unwrap_or_default().to_string()))
                        }))
                        .build()
                        .map_err(anyhow::Error::from)
                }
            })
            .guard(allow_when(Arc::clone(&is_admin), "admin")),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    assert!(router.navigate("/admin/books").await.expect("navigate").is_denied());
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    is_admin.store(true, Ordering::SeqCst);
    let route = activated(router.navigate("/admin/books").await.expect("manage"));
    assert_eq!(route.view, View::Manage);
    assert_eq!(route.route.pattern, "admin/books");
    assert_eq!(route.route.title.as_deref(), Some("Manage books"));

    let route = activated(router.navigate("/admin/books/new").await.expect("new"));
    assert_eq!(route.view, View::NewBook);

    let route = activated(router.navigate("/admin/books/9").await.expect("edit"));
    assert_eq!(route.view, View::BookForm("9".into()));
    assert_eq!(route.route.pattern, "admin/books/:id");
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    let route = activated(router.navigate("/admin/books/9/extra").await.expect("miss"));
    assert_eq!(route.view, View::NotFound);
}

#[tokio::test]
async fn failed_child_load_is_reported() {
    let table = RouteTable::builder()
        .route(RouteEntry::children("admin", || async {
            Err::<RouteTable<View>, _>(anyhow::anyhow!("bundle missing"))
        }))
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    let err = router.navigate("/admin").await.unwrap_err();
    assert!(matches!(err, NavigationError::ChildLoad { ref pattern, .. } if pattern == "admin"));
}

#[tokio::test]
async fn failed_view_load_is_reported() {
    let table = RouteTable::builder()
        .route(RouteEntry::lazy("search", |_| async {
            Err::<View, _>(anyhow::anyhow!("chunk failed"))
        }))
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    let err = router.navigate("/search").await.unwrap_err();
    assert!(matches!(err, NavigationError::ViewLoad { ref path, .. } if path == "/search"));
    assert!(router.active().await.is_none());
}

#[tokio::test]
async fn slices_follow_the_active_route() {
    let router = Router::new(storefront(Arc::default())).expect("router");

    router.navigate("/books/details/3").await.expect("details");
    let similar = router
        .registry()
        .get::<SimilarBooks>("similarBooks")
        .expect("slice installed");
    assert_eq!(*similar, SimilarBooks::default());

    router.navigate("/").await.expect("home");
    assert!(!router.registry().contains("similarBooks"));
}

#[tokio::test]
async fn slice_is_installed_before_the_view_resolves() {
    let seen = Arc::new(AtomicBool::new(false));
    let registry_slot: Arc<StdMutex<Option<StateRegistry>>> = Arc::default();
    let (flag, slot) = (Arc::clone(&seen), Arc::clone(&registry_slot));
    let table = RouteTable::builder()
        .route(
            RouteEntry::lazy("books/details/:id", move |_| {
                let flag = Arc::clone(&flag);
                let registry = slot.lock().expect("slot").clone();
                async move {
                    let installed = registry.is_some_and(|registry| registry.contains("similarBooks"));
                    flag.store(installed, Ordering::SeqCst);
                    Ok(View::Details("1".into()))
                }
            })
            .slice(Arc::new(SliceProvider::new(
                "similarBooks",
                SimilarBooks::default,
            ))),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");
    *registry_slot.lock().expect("slot") = Some(router.registry().clone());

    router.navigate("/books/details/1").await.expect("navigate");
    assert!(seen.load(Ordering::SeqCst));
}

#[tokio::test]
async fn guards_see_the_previous_path() {
    let from_seen: Arc<StdMutex<Option<String>>> = Arc::default();
    let slot = Arc::clone(&from_seen);
    let table = RouteTable::builder()
        .route(RouteEntry::component("", View::Home))
        .route(
            RouteEntry::component("books/new", View::NewBook).guard(Arc::new(FnGuard::new(
                "spy",
                move |request: &NavigationRequest| {
                    *slot.lock().expect("slot") = request.from.clone();
                    GuardDecision::Allow
                },
            ))),
        )
        .not_found(RouteEntry::component("**", View::NotFound))
        .build()
        .expect("table");
    let router = Router::new(table).expect("router");

    router.navigate("/").await.expect("home");
    router.navigate("/books/new").await.expect("new");
    assert_eq!(from_seen.lock().expect("slot").as_deref(), Some("/"));
}

#[tokio::test]
async fn leading_double_slash_stays_a_path() {
    let router = Router::new(storefront(Arc::default())).expect("router");

    let route = activated(router.navigate("//books/new").await.expect("navigate"));
    assert_eq!(route.view, View::NewBook);
    assert_eq!(route.route.path, "/books/new");

    let route = activated(router.navigate("\\\\books/new").await.expect("navigate"));
    assert_eq!(route.view, View::NewBook);
}

#[tokio::test]
async fn path_params_are_percent_decoded() {
    let router = Router::new(storefront(Arc::default())).expect("router");

    let route = activated(router.navigate("/books/details/4%32").await.expect("navigate"));
    assert_eq!(route.view, View::Details("42".into()));
    assert_eq!(route.route.params.get("id"), Some("42"));

    let route = activated(
        router
            .navigate("/books/details/caf%C3%A9%20noir")
            .await
            .expect("navigate"),
    );
    assert_eq!(route.view, View::Details("café noir".into()));
}
