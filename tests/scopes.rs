use ferrous_inject::{
    ContextSeed, DiError, FromContext, Object, Scope, Scoped, Scopes, Singleton, SyncContainer, Transient,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct RequestId(usize);

#[test]
fn test_request_scoped_instances_are_isolated_per_context() {
    let counter = Arc::new(AtomicUsize::new(0));
    let next = counter.clone();
    let container = SyncContainer::new();
    container
        .register(Scoped::new(move |_| Ok(RequestId(next.fetch_add(1, Ordering::SeqCst) + 1))))
        .unwrap();

    let first = container.context().unwrap();
    let second = container.context().unwrap();

    let a = first.get_sync::<RequestId>().unwrap();
    let b = first.get_sync::<RequestId>().unwrap();
    let c = second.get_sync::<RequestId>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!((a.0, c.0), (1, 2));
}

#[test]
fn test_cannot_resolve_request_scoped_from_root() {
    let container = SyncContainer::new();
    container.register(Scoped::new(|_| Ok(RequestId(0)))).unwrap();

    match container.root().get_sync::<RequestId>() {
        Err(DiError::ScopeNotActive { scope, .. }) => assert_eq!(scope, "request"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_no_scope_past_the_innermost_tier() {
    let container = SyncContainer::new();
    let request = container.context().unwrap();
    assert_eq!(request.scope(), Scope::REQUEST);
    assert!(matches!(request.child(), Err(DiError::NoScope("request"))));
}

struct Config;
struct Session;
struct Handler {
    config: Arc<Config>,
    session: Arc<Session>,
}

fn three_tiers() -> SyncContainer {
    let container = SyncContainer::builder()
        .scopes(Scopes::new(["app", "session", "request"]))
        .build_sync()
        .unwrap();
    let session = container.scopes().get("session").unwrap();
    let request = container.scopes().get("request").unwrap();

    container.register(Singleton::new(|_| Ok(Config))).unwrap();
    container
        .register(Scoped::new(|_| Ok(Session)).with_scope(session))
        .unwrap();
    container
        .register(
            Scoped::new(|deps| {
                Ok(Handler {
                    config: deps.get("config")?,
                    session: deps.get("session")?,
                })
            })
            .with_scope(request)
            .dependency::<Config>("config")
            .dependency::<Session>("session"),
        )
        .unwrap();
    container
}

#[test]
fn test_custom_tiers_share_ancestor_instances() {
    let container = three_tiers();
    let session = container.context().unwrap();
    assert_eq!(session.scope().name(), "session");

    let first = session.child().unwrap();
    let second = session.child().unwrap();
    let a = first.get_sync::<Handler>().unwrap();
    let b = second.get_sync::<Handler>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.session, &b.session));
    assert!(Arc::ptr_eq(&a.config, &b.config));

    let other_session = container.context().unwrap().child().unwrap();
    let c = other_session.get_sync::<Handler>().unwrap();
    assert!(!Arc::ptr_eq(&a.session, &c.session));
    assert!(Arc::ptr_eq(&a.config, &c.config));
}

#[test]
fn test_inner_resolution_lands_in_owning_context() {
    let container = three_tiers();
    let session = container.context().unwrap();
    let request = session.child().unwrap();

    // Built from the request, owned by the session.
    let from_request = request.get_sync::<Session>().unwrap();
    let from_session = session.get_sync::<Session>().unwrap();
    assert!(Arc::ptr_eq(&from_request, &from_session));

    // The handler stays in the request context.
    assert!(matches!(session.get_sync::<Handler>(), Err(DiError::ScopeNotActive { .. })));
}

#[test]
fn test_unknown_scope_is_rejected_at_registration() {
    let container = SyncContainer::new();
    let foreign = Scopes::new(["app", "session", "request"]).get("session").unwrap();
    assert!(matches!(
        container.register(Scoped::new(|_| Ok(Session)).with_scope(foreign)),
        Err(DiError::UnknownScope { scope: "session", .. })
    ));
}

#[test]
fn test_default_tiers_of_provider_kinds() {
    let container = SyncContainer::new();
    container.register(Singleton::new(|_| Ok(Config))).unwrap();
    container.register(Scoped::new(|_| Ok(Session))).unwrap();
    container.register(Transient::new(|_| Ok(RequestId(0)))).unwrap();
    container.register(Object::new(3_u8)).unwrap();
    container.register(FromContext::of::<String>()).unwrap();

    let scopes: Vec<_> = container.descriptors().into_iter().map(|d| d.scope).collect();
    assert_eq!(scopes, ["lifetime", "request", "request", "lifetime", "request"]);
}

#[test]
fn test_seeded_values_are_visible_to_descendants_only() {
    let container = SyncContainer::builder()
        .scopes(Scopes::new(["app", "session", "request"]))
        .build_sync()
        .unwrap();
    let session_tier = container.scopes().get("session").unwrap();
    container
        .register(FromContext::of::<String>().with_scope(session_tier))
        .unwrap();

    let session = container
        .context_with(ContextSeed::new().with(String::from("alice")))
        .unwrap();
    let request = session.child().unwrap();
    assert_eq!(*request.get_sync::<String>().unwrap(), "alice");

    let other = container.context().unwrap().child().unwrap();
    assert!(matches!(other.get_sync::<String>(), Err(DiError::MissingContextValue(_))));
}

#[test]
fn test_single_tier_container() {
    let container = SyncContainer::builder()
        .scopes(Scopes::new(["lifetime"]))
        .build_sync()
        .unwrap();
    container.register(Scoped::new(|_| Ok(Session))).unwrap();

    let root = container.root();
    assert!(Arc::ptr_eq(
        &root.get_sync::<Session>().unwrap(),
        &root.get_sync::<Session>().unwrap()
    ));
    assert!(matches!(container.context(), Err(DiError::NoScope("lifetime"))));
}
