use ferrous_inject::{AsyncDispose, Container, DiError, Dispose, Resource, Scoped, Singleton, SyncContainer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_singleton_resource_outlives_requests() {
    let released = Arc::new(AtomicUsize::new(0));
    let hook = released.clone();

    let container = Container::new();
    container
        .register(Singleton::resource_async(move |_| {
            let hook = hook.clone();
            async move {
                Ok(Resource::new_async(42_i32, move |_| async move {
                    hook.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            }
        }))
        .unwrap();

    let observed = released.clone();
    container
        .run(|container| async move {
            let root = container.root();
            let first = root
                .scoped(|request| async move { request.get::<i32>().await })
                .await?;
            assert_eq!(observed.load(Ordering::SeqCst), 0);

            let second = root
                .scoped(|request| async move { request.get::<i32>().await })
                .await?;
            assert_eq!(observed.load(Ordering::SeqCst), 0);

            assert_eq!(*first, 42);
            assert!(Arc::ptr_eq(&first, &second));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

struct A;
struct B;
struct C;

#[test]
fn test_teardown_runs_in_reverse_acquisition_order() {
    let released = log();
    let container = SyncContainer::new();

    let hook = released.clone();
    container
        .register(Scoped::resource(move |_| {
            let hook = hook.clone();
            Ok(Resource::new(A, move |_| {
                hook.lock().unwrap().push("A".into());
                Ok(())
            }))
        }))
        .unwrap();
    let hook = released.clone();
    container
        .register(
            Scoped::resource(move |_| {
                let hook = hook.clone();
                Ok(Resource::new(B, move |_| {
                    hook.lock().unwrap().push("B".into());
                    Ok(())
                }))
            })
            .dependency::<A>("a"),
        )
        .unwrap();
    let hook = released.clone();
    container
        .register(
            Scoped::resource(move |_| {
                let hook = hook.clone();
                Ok(Resource::new(C, move |_| {
                    hook.lock().unwrap().push("C".into());
                    Ok(())
                }))
            })
            .dependency::<B>("b"),
        )
        .unwrap();

    let request = container.context().unwrap();
    request.get_sync::<C>().unwrap();
    assert!(entries(&released).is_empty());

    request.close_sync().unwrap();
    assert_eq!(entries(&released), ["C", "B", "A"]);
}

#[tokio::test]
async fn test_cleanup_continues_after_a_failing_release() {
    let released = log();
    let container = Container::new();

    let hook = released.clone();
    container
        .register(Scoped::resource(move |_| {
            let hook = hook.clone();
            Ok(Resource::new(A, move |_| {
                hook.lock().unwrap().push("A".into());
                Ok(())
            }))
        }))
        .unwrap();
    container
        .register(
            Scoped::resource(|_| Ok(Resource::new(B, |_| Err(DiError::provider("socket already closed")))))
                .dependency::<A>("a"),
        )
        .unwrap();
    let hook = released.clone();
    container
        .register(
            Scoped::resource_async(move |_| {
                let hook = hook.clone();
                async move {
                    Ok(Resource::new_async(C, move |_| async move {
                        hook.lock().unwrap().push("C".into());
                        Ok(())
                    }))
                }
            })
            .dependency::<B>("b"),
        )
        .unwrap();

    let request = container.context().unwrap();
    request.get::<C>().await.unwrap();

    match request.close().await {
        Err(DiError::Cleanup { resource, source }) => {
            assert!(resource.ends_with("::B"));
            assert!(matches!(*source, DiError::Provider(_)));
        }
        other => panic!("expected a cleanup error, got {:?}", other),
    }
    assert_eq!(entries(&released), ["C", "A"]);
}

#[test]
fn test_several_failing_releases_are_aggregated() {
    let container = SyncContainer::new();
    container
        .register(Scoped::resource(|_| Ok(Resource::new(A, |_| Err(DiError::provider("a"))))))
        .unwrap();
    container
        .register(
            Scoped::resource(|_| Ok(Resource::new(B, |_| Err(DiError::provider("b"))))).dependency::<A>("a"),
        )
        .unwrap();

    let request = container.context().unwrap();
    request.get_sync::<B>().unwrap();

    match request.close_sync() {
        Err(DiError::Teardown(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors[0].to_string().contains("::B"));
        }
        other => panic!("expected a teardown error, got {:?}", other),
    }
}

#[test]
fn test_body_error_wins_over_cleanup_error() {
    let container = SyncContainer::new();
    container
        .register(Scoped::resource(|_| Ok(Resource::new(A, |_| Err(DiError::provider("release"))))))
        .unwrap();

    let result: Result<(), DiError> = container.root().scoped_sync(|request| {
        request.get_sync::<A>()?;
        Err(DiError::provider("body"))
    });
    match result {
        Err(DiError::Provider(source)) => assert_eq!(source.to_string(), "body"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_async_release_fails_in_sync_close() {
    let container = SyncContainer::new();
    container
        .register(Scoped::resource(|_| Ok(Resource::new_async(A, |_| async { Ok(()) }))))
        .unwrap();

    let request = container.context().unwrap();
    request.get_sync::<A>().unwrap();
    match request.close_sync() {
        Err(DiError::Cleanup { source, .. }) => assert!(matches!(*source, DiError::AsyncProvider(_))),
        other => panic!("unexpected: {:?}", other),
    }
}

struct FileHandle {
    closed: Arc<AtomicUsize>,
}

impl Dispose for FileHandle {
    fn dispose(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Client {
    closed: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl AsyncDispose for Client {
    async fn dispose(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_dispose_traits_release_resources() {
    let closed = Arc::new(AtomicUsize::new(0));
    let container = Container::new();

    let counter = closed.clone();
    container
        .register(Scoped::resource(move |_| {
            Ok(Resource::disposable(FileHandle {
                closed: counter.clone(),
            }))
        }))
        .unwrap();
    let counter = closed.clone();
    container
        .register(Scoped::resource_async(move |_| {
            let counter = counter.clone();
            async move { Ok(Resource::async_disposable(Client { closed: counter })) }
        }))
        .unwrap();

    container
        .root()
        .scoped(|request| async move {
            request.get::<FileHandle>().await?;
            request.get::<Client>().await?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_request_resources_released_per_request() {
    let released = Arc::new(AtomicUsize::new(0));
    let hook = released.clone();
    let container = SyncContainer::new();
    container
        .register(Scoped::resource(move |_| {
            let hook = hook.clone();
            Ok(Resource::new(A, move |_| {
                hook.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
        }))
        .unwrap();

    for expected in 1..=3 {
        container
            .root()
            .scoped_sync(|request| request.get_sync::<A>().map(|_| ()))
            .unwrap();
        assert_eq!(released.load(Ordering::SeqCst), expected);
    }
}

struct Connection;

struct Report {
    _connection: Arc<Connection>,
}

#[tokio::test]
async fn test_cancelled_resolution_keeps_acquired_resources_releasable() {
    let opened = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (open_hook, release_hook) = (opened.clone(), released.clone());

    let container = Container::new();
    container
        .register(Scoped::resource_async(move |_| {
            let (open_hook, release_hook) = (open_hook.clone(), release_hook.clone());
            async move {
                open_hook.fetch_add(1, Ordering::SeqCst);
                Ok(Resource::new(Connection, move |_| {
                    release_hook.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            }
        }))
        .unwrap();
    container
        .register(
            Scoped::new_async(|deps| async move {
                let connection = deps.get::<Connection>("connection")?;
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, DiError>(Report {
                    _connection: connection,
                })
            })
            .dependency::<Connection>("connection"),
        )
        .unwrap();

    let request = container.context().unwrap();
    let cancelled = tokio::time::timeout(Duration::from_millis(50), request.get::<Report>()).await;
    assert!(cancelled.is_err());
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(released.load(Ordering::SeqCst), 0);

    // Still cached after the cancellation; no second acquisition.
    request.get::<Connection>().await.unwrap();
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    request.close().await.unwrap();
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
