use async_trait::async_trait;
use ferrous_inject::{
    Container, Context, Dependencies, DiError, DiResult, Directives, Extension, ExtractContext, Implementation,
    Instance, LifespanExtension, OnResolveExtension, Provided, Provider, ProviderExtension, ProviderInfo,
    ProviderRecord, Release, Scoped, Singleton, SyncContainer, TypeKey,
};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A setting read from a fixed table, registered under its own key.
struct Setting {
    key: &'static str,
    value: &'static str,
}

#[derive(Debug, PartialEq)]
struct SettingValue(&'static str);

impl Provider for Setting {
    fn implementation(&self) -> Implementation {
        Implementation::Context(TypeKey::named(self.key))
    }

    fn provide(&self, _: Dependencies) -> DiResult<Provided> {
        Ok(Provided::Value(Arc::new(SettingValue(self.value)) as Instance))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SettingExtension;

impl ProviderExtension for SettingExtension {
    fn name(&self) -> &'static str {
        "setting"
    }

    fn supports_provider(&self, provider: &dyn Provider) -> bool {
        provider.as_any().is::<Setting>()
    }

    fn extract(&self, provider: &dyn Provider, context: &ExtractContext<'_>) -> DiResult<ProviderInfo> {
        let setting = provider
            .as_any()
            .downcast_ref::<Setting>()
            .ok_or(DiError::TypeMismatch("Setting"))?;
        let key = TypeKey::named(format!("setting:{}", setting.key));
        Ok(ProviderInfo {
            interface: key.clone(),
            actual_type: key,
            dependencies: Vec::new(),
            scope: context.scopes.first(),
            directives: Directives::new().cached().resolved(false, false),
        })
    }
}

#[test]
fn test_custom_provider_kind() {
    let container = SyncContainer::builder()
        .extension(Extension::provider(SettingExtension))
        .build_sync()
        .unwrap();
    container
        .register(Setting {
            key: "region",
            value: "eu-west-1",
        })
        .unwrap();

    let value = container
        .root()
        .resolve_sync(&TypeKey::named("setting:region"))
        .unwrap();
    assert_eq!(value.downcast_ref::<SettingValue>(), Some(&SettingValue("eu-west-1")));

    let descriptor = &container.descriptors()[0];
    assert_eq!(descriptor.extension, "setting");
    assert!(descriptor.cached);
}

#[test]
fn test_provider_without_extension_is_unsupported() {
    let container = SyncContainer::new();
    let result = container.register(Setting {
        key: "region",
        value: "eu-west-1",
    });
    assert!(matches!(result, Err(DiError::UnsupportedProvider(_))));
}

#[test]
fn test_default_extensions_can_be_replaced() {
    struct Pool;

    let container = SyncContainer::builder()
        .default_extensions([Extension::provider(SettingExtension)])
        .build_sync()
        .unwrap();
    assert!(matches!(
        container.register(Scoped::new(|_| Ok(Pool))),
        Err(DiError::UnsupportedProvider(_))
    ));
}

struct Broker {
    connected: Arc<AtomicUsize>,
}

#[async_trait]
impl LifespanExtension for Broker {
    async fn lifespan(&self, container: &Container) -> DiResult<Option<Release>> {
        self.connected.fetch_add(1, Ordering::SeqCst);
        assert!(container.is_registered(&TypeKey::of::<u32>()));
        let connected = self.connected.clone();
        Ok(Some(Release::new_async(move || async move {
            connected.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })))
    }
}

#[tokio::test]
async fn test_lifespan_spans_the_container_body() {
    let connected = Arc::new(AtomicUsize::new(0));
    let container = Container::builder()
        .extension(Extension::lifespan(Broker {
            connected: connected.clone(),
        }))
        .build()
        .unwrap();
    container.register(Singleton::new(|_| Ok(7_u32))).unwrap();

    let inside = connected.clone();
    let value = container
        .run(|container| async move {
            assert_eq!(inside.load(Ordering::SeqCst), 1);
            container.context()?.get::<u32>().await
        })
        .await
        .unwrap();

    assert_eq!(*value, 7);
    assert_eq!(connected.load(Ordering::SeqCst), 0);
}

struct Audit {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OnResolveExtension for Audit {
    async fn on_resolve(&self, context: &Context, record: &ProviderRecord, _: &Instance) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}@{}", record.info.interface, context.scope()));
    }
}

#[tokio::test]
async fn test_async_observers_see_constructions_not_hits() {
    struct Pool;
    struct Repo;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = Container::builder()
        .extension(Extension::on_resolve(Audit { seen: seen.clone() }))
        .build()
        .unwrap();
    container.register(Singleton::new(|_| Ok(Pool))).unwrap();
    container
        .register(Scoped::new(|_| Ok(Repo)).dependency::<Pool>("pool"))
        .unwrap();

    for _ in 0..2 {
        let request = container.context().unwrap();
        request.get::<Repo>().await.unwrap();
        request.get::<Repo>().await.unwrap();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].ends_with("Pool@lifetime"));
    assert!(seen[1].ends_with("Repo@request"));
    assert!(seen[2].ends_with("Repo@request"));
}

#[test]
fn test_sync_resolution_skips_async_observers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = SyncContainer::builder()
        .extension(Extension::on_resolve(Audit { seen: seen.clone() }))
        .build_sync()
        .unwrap();
    container.register(Singleton::new(|_| Ok(1_i64))).unwrap();

    container.root().get_sync::<i64>().unwrap();
    assert!(seen.lock().unwrap().is_empty());
}
