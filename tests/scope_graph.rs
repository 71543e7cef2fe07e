//! End-to-end tests of scope entry, memoization and parent delegation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use scopegraph::{Blueprint, Graph, Scope, ScopeDef, ScopeError};

/// Stand-ins for the objects an application graph builds.
struct HttpClient {
    serial: usize,
}

struct OrderRepository {
    client: Arc<HttpClient>,
}

struct OrdersViewModel {
    repo: Arc<OrderRepository>,
    restored: Arc<String>,
}

/// singleton -> activity_retained -> { activity, view_model }
fn app_graph(client_builds: Arc<AtomicUsize>) -> Arc<Graph> {
    Blueprint::new()
        .scope(
            ScopeDef::root("singleton")
                .scoped("http_client", &[], move |_| {
                    thread::sleep(Duration::from_millis(10));
                    Ok(HttpClient {
                        serial: client_builds.fetch_add(1, Ordering::SeqCst),
                    })
                })
                .scoped("order_repo", &["http_client"], |r| {
                    Ok(OrderRepository {
                        client: r.get("http_client")?,
                    })
                }),
        )
        .scope(ScopeDef::child("activity_retained", "singleton").input("retained_state"))
        .scope(
            ScopeDef::child("activity", "activity_retained")
                .input("activity")
                .scoped("title", &["activity"], |r| {
                    Ok(format!("screen:{}", r.get::<String>("activity")?))
                }),
        )
        .scope(
            ScopeDef::child("view_model", "activity_retained")
                .input("saved_state")
                .per_request("orders_vm", &["order_repo", "saved_state"], |r| {
                    Ok(OrdersViewModel {
                        repo: r.get("order_repo")?,
                        restored: r.get("saved_state")?,
                    })
                })
                .key("OrdersViewModel", "orders_vm"),
        )
        .compile()
        .unwrap()
}

fn enter(parent: &Scope, kind: &str, input: &str, value: &str) -> Scope {
    parent
        .child_builder(kind)
        .unwrap()
        .with_input(input, value.to_string())
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_counter_scenario() {
    let counter = Arc::new(AtomicUsize::new(0));
    let recipe_counter = Arc::clone(&counter);
    let graph = Blueprint::new()
        .scope(ScopeDef::root("root").scoped("a", &[], move |_| {
            Ok(recipe_counter.fetch_add(1, Ordering::SeqCst))
        }))
        .scope(ScopeDef::child("child", "root"))
        .compile()
        .unwrap();

    let root = graph.builder("root").unwrap().build().unwrap();
    let values: Vec<usize> = (0..3).map(|_| *root.get::<usize>("a").unwrap()).collect();
    assert_eq!(values, vec![0, 0, 0]);

    let child = root.child_builder("child").unwrap().build().unwrap();
    assert_eq!(*child.get::<usize>("a").unwrap(), 0);

    child.close();
    assert_eq!(*root.get::<usize>("a").unwrap(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sequential_resolution_is_referentially_stable() {
    let graph = app_graph(Arc::new(AtomicUsize::new(0)));
    let app = graph.builder("singleton").unwrap().build().unwrap();

    let first = app.get::<OrderRepository>("order_repo").unwrap();
    for _ in 0..10 {
        assert!(Arc::ptr_eq(&first, &app.get("order_repo").unwrap()));
    }
}

#[test]
fn test_concurrent_resolution_runs_recipe_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let graph = app_graph(Arc::clone(&builds));
    let app = graph.builder("singleton").unwrap().build().unwrap();
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                app.get::<OrderRepository>("order_repo").unwrap()
            })
        })
        .collect();

    let repos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(repos.iter().all(|r| Arc::ptr_eq(r, &repos[0])));
}

#[test]
fn test_sibling_scopes_do_not_share_values() {
    let graph = app_graph(Arc::new(AtomicUsize::new(0)));
    let app = graph.builder("singleton").unwrap().build().unwrap();
    let retained = enter(&app, "activity_retained", "retained_state", "r");

    let main = enter(&retained, "activity", "activity", "main");
    let settings = enter(&retained, "activity", "activity", "main");

    let a = main.get::<String>("title").unwrap();
    let b = settings.get::<String>("title").unwrap();
    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(main.id(), settings.id());
}

#[test]
fn test_separate_roots_do_not_share_values() {
    let builds = Arc::new(AtomicUsize::new(0));
    let graph = app_graph(Arc::clone(&builds));

    let first = graph.builder("singleton").unwrap().build().unwrap();
    let second = graph.builder("singleton").unwrap().build().unwrap();

    let a = first.get::<HttpClient>("http_client").unwrap();
    let b = second.get::<HttpClient>("http_client").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.serial, b.serial);
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_descendant_resolves_ancestor_value_without_duplication() {
    let builds = Arc::new(AtomicUsize::new(0));
    let graph = app_graph(Arc::clone(&builds));
    let app = graph.builder("singleton").unwrap().build().unwrap();
    let retained = enter(&app, "activity_retained", "retained_state", "r");
    let vm_scope = enter(&retained, "view_model", "saved_state", "page=2");

    let vm = vm_scope
        .registry()
        .lookup("OrdersViewModel")
        .unwrap()
        .get::<OrdersViewModel>()
        .unwrap();

    assert_eq!(*vm.restored, "page=2");
    assert!(Arc::ptr_eq(&vm.repo, &app.get("order_repo").unwrap()));
    assert!(Arc::ptr_eq(
        &vm.repo.client,
        &retained.get("http_client").unwrap()
    ));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_per_request_values_are_fresh_but_share_dependencies() {
    let graph = app_graph(Arc::new(AtomicUsize::new(0)));
    let app = graph.builder("singleton").unwrap().build().unwrap();
    let retained = enter(&app, "activity_retained", "retained_state", "r");
    let vm_scope = enter(&retained, "view_model", "saved_state", "s");

    let a = vm_scope.get::<OrdersViewModel>("orders_vm").unwrap();
    let b = vm_scope.get::<OrdersViewModel>("orders_vm").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.repo, &b.repo));
}

#[test]
fn test_child_teardown_releases_its_values_only() {
    let graph = app_graph(Arc::new(AtomicUsize::new(0)));
    let app = graph.builder("singleton").unwrap().build().unwrap();
    let retained = enter(&app, "activity_retained", "retained_state", "r");
    let activity = enter(&retained, "activity", "activity", "main");

    let title = activity.get::<String>("title").unwrap();
    let repo = app.get::<OrderRepository>("order_repo").unwrap();
    assert_eq!(Arc::strong_count(&title), 2);

    activity.close();
    assert_eq!(Arc::strong_count(&title), 1);
    assert!(Arc::ptr_eq(&repo, &app.get("order_repo").unwrap()));
}

#[test]
fn test_recipe_failure_propagates_and_allows_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let recipe_attempts = Arc::clone(&attempts);
    let graph = Blueprint::new()
        .scope(ScopeDef::root("singleton").scoped("session", &[], move |_| {
            if recipe_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("token endpoint unavailable");
            }
            Ok("session-token".to_string())
        }))
        .compile()
        .unwrap();
    let app = graph.builder("singleton").unwrap().build().unwrap();

    let err = app.get::<String>("session").unwrap_err();
    assert_eq!(err.to_string(), "token endpoint unavailable");
    assert!(err.recipe_error().is_some());

    assert_eq!(*app.get::<String>("session").unwrap(), "session-token");
    assert_eq!(*app.get::<String>("session").unwrap(), "session-token");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_nested_scope_errors_surface_unchanged() {
    let graph = Blueprint::new()
        .scope(
            ScopeDef::root("singleton")
                .scoped("config", &[], |_| Ok(5u32))
                .scoped("client", &["config"], |r| {
                    Ok(r.get::<String>("config")?.to_uppercase())
                }),
        )
        .compile()
        .unwrap();
    let app = graph.builder("singleton").unwrap().build().unwrap();

    let err = app.get::<String>("client").unwrap_err();
    assert!(matches!(err, ScopeError::TypeMismatch { ref name, .. } if name == "config"));
}

#[test]
fn test_unrelated_providers_resolve_concurrently() {
    let (ready_tx, ready_rx) = mpsc::channel::<()>();
    let ready_tx = Mutex::new(ready_tx);
    let ready_rx = Mutex::new(ready_rx);

    // `waiting` only finishes once `signal` has run in the same scope.
    let graph = Blueprint::new()
        .scope(
            ScopeDef::root("singleton")
                .scoped("waiting", &[], move |_| {
                    ready_rx
                        .lock()
                        .unwrap()
                        .recv_timeout(Duration::from_secs(5))?;
                    Ok("released".to_string())
                })
                .scoped("signal", &[], move |_| {
                    ready_tx.lock().unwrap().send(())?;
                    Ok("sent".to_string())
                }),
        )
        .compile()
        .unwrap();
    let app = graph.builder("singleton").unwrap().build().unwrap();

    let waiter = {
        let app = app.clone();
        thread::spawn(move || app.get::<String>("waiting"))
    };
    thread::sleep(Duration::from_millis(20));
    let signaller = {
        let app = app.clone();
        thread::spawn(move || app.get::<String>("signal"))
    };

    assert_eq!(*signaller.join().unwrap().unwrap(), "sent");
    assert_eq!(*waiter.join().unwrap().unwrap(), "released");
}
