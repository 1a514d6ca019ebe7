//! End-to-end проверки двухуровневого контейнера через публичный API:
//! глобальный scope, scene-scope с fallback-ом, host-граф, lifecycle.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rigging::{
    install, try_current, ConstructorSpec, ContainerConfig, ContainerError, HostAdapter,
    HostQuery, Lifecycle, NullHostAdapter, SceneId, ServiceRuntime,
};
use serial_test::serial;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rigging=debug")
        .with_test_writer()
        .try_init();
}

/// Фейковый граф сцены: заранее положенные объекты + активная сцена.
#[derive(Default)]
struct FakeSceneGraph {
    objects: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    active: Mutex<Option<SceneId>>,
    queries: Mutex<Vec<Option<String>>>,
}

impl FakeSceneGraph {
    fn put<T: Send + Sync + 'static>(&self, value: T) {
        self.objects
            .lock()
            .expect("fake graph lock")
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    fn activate(&self, id: &SceneId) {
        *self.active.lock().expect("fake graph lock") = Some(id.clone());
    }
}

impl HostAdapter for FakeSceneGraph {
    fn find_existing(&self, query: &HostQuery) -> Option<Arc<dyn Any + Send + Sync>> {
        self.queries
            .lock()
            .expect("fake graph lock")
            .push(query.search_root.clone());
        self.objects
            .lock()
            .expect("fake graph lock")
            .get(&query.type_id)
            .cloned()
    }

    fn active_scene(&self) -> Option<SceneId> {
        self.active.lock().expect("fake graph lock").clone()
    }
}

#[test]
fn scene_scope_falls_back_to_global_and_shadows_it() {
    init_tracing();

    struct Tuning {
        gravity: f32,
    }
    impl Lifecycle for Tuning {}

    let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
    runtime
        .global()
        .bind_instance(Tuning { gravity: 9.8 })
        .expect("global bind");

    let scene = runtime.scene(&SceneId::new("Hangar"));

    // Тип привязан только глобально: scene-scope достаёт его через fallback.
    let global_tuning = scene.get::<Tuning>().expect("fallback to global");
    assert_eq!(global_tuning.gravity, 9.8);

    // Привязан в обоих: побеждает scene-local.
    scene
        .bind_instance(Tuning { gravity: 1.6 })
        .expect("scene bind");
    assert_eq!(scene.get::<Tuning>().expect("scene-local wins").gravity, 1.6);
    assert_eq!(
        runtime
            .global()
            .get::<Tuning>()
            .expect("global untouched")
            .gravity,
        9.8
    );
}

#[test]
fn host_discovered_dependency_is_cached_into_scene_scope() {
    init_tracing();

    struct SpawnPoint {
        index: u32,
    }

    struct Spawner {
        point: Arc<SpawnPoint>,
    }
    impl Lifecycle for Spawner {}

    let graph = Arc::new(FakeSceneGraph::default());
    graph.put(SpawnPoint { index: 3 });

    let runtime = ServiceRuntime::new(graph.clone());
    runtime.catalog().declare_host::<SpawnPoint>(Some("Level/Spawns"));
    runtime.catalog().declare(
        ConstructorSpec::of::<Spawner>()
            .param::<SpawnPoint>()
            .build_with(|args| {
                Ok(Spawner {
                    point: args.get::<SpawnPoint>()?,
                })
            }),
    );

    let scene = runtime.scene(&SceneId::new("Arena"));
    scene.bind_concrete::<Spawner>().expect("spawner wiring");

    // Находка закэширована в scene-scope, глобальный scope её не видит.
    let cached = scene.get::<SpawnPoint>().expect("cached in scene");
    assert_eq!(cached.index, 3);
    assert!(runtime.global().try_get::<SpawnPoint>().is_none());
    assert!(Arc::ptr_eq(
        &scene.get::<Spawner>().expect("spawner bound").point,
        &cached
    ));

    // Адаптер спрашивали с назначенным корнем поиска.
    let queries = graph.queries.lock().expect("fake graph lock");
    assert_eq!(queries.as_slice(), &[Some("Level/Spawns".to_string())]);
}

#[test]
fn missing_host_object_fails_the_bind() {
    init_tracing();

    struct MissingRig;
    struct Vehicle {
        _rig: Arc<MissingRig>,
    }
    impl Lifecycle for Vehicle {}

    let runtime = ServiceRuntime::new(Arc::new(FakeSceneGraph::default()));
    runtime.catalog().declare_host::<MissingRig>(None);
    runtime.catalog().declare(
        ConstructorSpec::of::<Vehicle>()
            .param::<MissingRig>()
            .build_with(|args| {
                Ok(Vehicle {
                    _rig: args.get::<MissingRig>()?,
                })
            }),
    );

    let err = runtime
        .global()
        .bind_concrete::<Vehicle>()
        .expect_err("lookup must fail");
    assert!(matches!(err, ContainerError::NoSuitableConstructor { .. }));
    assert!(err.to_string().contains("host lookup failed"));
    assert!(!runtime.global().contains::<Vehicle>());
}

#[test]
fn initialize_runs_in_dependency_order_exactly_once() {
    init_tracing();

    static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct Storage;
    impl Lifecycle for Storage {
        fn initialize(&self) -> anyhow::Result<()> {
            ORDER.lock().expect("order lock").push("storage");
            Ok(())
        }
    }

    struct Inventory {
        _storage: Arc<Storage>,
    }
    impl Lifecycle for Inventory {
        fn initialize(&self) -> anyhow::Result<()> {
            ORDER.lock().expect("order lock").push("inventory");
            Ok(())
        }
    }

    let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
    runtime
        .catalog()
        .declare(ConstructorSpec::of::<Storage>().build_with(|_| Ok(Storage)));
    runtime.catalog().declare(
        ConstructorSpec::of::<Inventory>()
            .param::<Storage>()
            .build_with(|args| {
                Ok(Inventory {
                    _storage: args.get::<Storage>()?,
                })
            }),
    );

    runtime
        .global()
        .bind_concrete::<Inventory>()
        .expect("inventory wiring");

    let order = ORDER.lock().expect("order lock");
    assert_eq!(order.as_slice(), &["storage", "inventory"]);
}

#[test]
fn cycle_aborts_without_partial_registration() {
    init_tracing();

    struct A {
        _b: Arc<B>,
    }
    impl Lifecycle for A {}
    struct B {
        _a: Arc<A>,
    }
    impl Lifecycle for B {}

    let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
    runtime
        .catalog()
        .declare(ConstructorSpec::of::<A>().param::<B>().build_with(|args| {
            Ok(A {
                _b: args.get::<B>()?,
            })
        }));
    runtime
        .catalog()
        .declare(ConstructorSpec::of::<B>().param::<A>().build_with(|args| {
            Ok(B {
                _a: args.get::<A>()?,
            })
        }));

    let err = runtime
        .global()
        .bind_concrete::<A>()
        .expect_err("cycle must abort");
    assert!(matches!(err, ContainerError::CyclicDependency { .. }));
    assert!(!runtime.global().contains::<A>());
    assert!(!runtime.global().contains::<B>());
    assert_eq!(runtime.global().stats().bound_services, 0);
}

#[test]
fn abandoned_candidate_leaves_no_staged_dependencies() {
    init_tracing();

    static HEAVY_BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Heavy;
    impl Lifecycle for Heavy {}
    struct Absent;
    struct Radar {
        long_range: bool,
    }
    impl Lifecycle for Radar {}

    let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
    runtime.catalog().declare(
        ConstructorSpec::of::<Heavy>().build_with(|_| {
            HEAVY_BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Heavy)
        }),
    );
    // Жадный кандидат: Heavy разрешается, Absent — нет.
    runtime.catalog().declare(
        ConstructorSpec::of::<Radar>()
            .param::<Heavy>()
            .param::<Absent>()
            .build_with(|_| Ok(Radar { long_range: true })),
    );
    runtime.catalog().declare(
        ConstructorSpec::of::<Radar>().build_with(|_| Ok(Radar { long_range: false })),
    );

    runtime
        .global()
        .bind_concrete::<Radar>()
        .expect("zero-arg fallback should win");

    assert!(!runtime.global().get::<Radar>().expect("radar bound").long_range);
    // Heavy сконструировался в брошенном кандидате, но не остался в scope.
    assert_eq!(HEAVY_BUILT.load(Ordering::SeqCst), 1);
    assert!(!runtime.global().contains::<Heavy>());
}

#[test]
fn interface_binding_resolves_through_scene_fallback() {
    init_tracing();

    trait TargetFinder: Send + Sync {
        fn range(&self) -> u32;
    }

    struct RadarFinder;
    impl Lifecycle for RadarFinder {}
    impl TargetFinder for RadarFinder {
        fn range(&self) -> u32 {
            250
        }
    }

    let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
    runtime
        .catalog()
        .declare(ConstructorSpec::of::<RadarFinder>().build_with(|_| Ok(RadarFinder)));
    runtime
        .global()
        .bind_interface::<dyn TargetFinder, RadarFinder, _>(|imp| imp)
        .expect("interface wiring");

    let scene = runtime.scene(&SceneId::new("Arena"));
    let finder = scene
        .get::<dyn TargetFinder>()
        .expect("trait key via fallback");
    assert_eq!(finder.range(), 250);

    let err = runtime
        .global()
        .bind_interface::<dyn TargetFinder, RadarFinder, _>(|imp| imp)
        .expect_err("duplicate interface bind must fail");
    assert!(matches!(err, ContainerError::DuplicateBinding { .. }));
}

#[test]
fn unload_scene_disposes_owned_but_not_host_owned() {
    init_tracing();

    static DISPOSED: AtomicUsize = AtomicUsize::new(0);

    struct SceneAudio;
    impl Lifecycle for SceneAudio {
        fn dispose(&self) -> anyhow::Result<()> {
            DISPOSED.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SceneTerrain;

    let graph = Arc::new(FakeSceneGraph::default());
    graph.put(SceneTerrain);

    let runtime = ServiceRuntime::new(graph);
    let id = SceneId::new("Canyon");
    let scene = runtime.scene(&id);
    scene.bind_instance(SceneAudio).expect("audio bind");
    scene
        .bind_from_host::<SceneTerrain>(None)
        .expect("terrain discovery");

    assert!(runtime.unload_scene(&id));
    assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
    assert!(runtime.loaded_scenes().is_empty());
}

#[test]
fn current_scene_selection_follows_active_scene() {
    init_tracing();

    let graph = Arc::new(FakeSceneGraph::default());
    let runtime = ServiceRuntime::new(graph.clone());

    let menu = SceneId::new("Menu");
    let battle = SceneId::new("Battle");
    runtime.scene(&menu);
    runtime.scene(&battle);

    graph.activate(&battle);
    let current = runtime.current_scene();
    assert_eq!(current.scope().to_string(), "scene:Battle");

    // Привязка в текущем scope не видна другой сцене.
    struct BattleHud;
    impl Lifecycle for BattleHud {}
    current.bind_instance(BattleHud).expect("hud bind");
    assert!(runtime.scene(&menu).try_get::<BattleHud>().is_none());
}

#[test]
#[serial]
fn installed_runtime_is_process_visible() {
    init_tracing();

    struct Session {
        id: u32,
    }
    impl Lifecycle for Session {}

    let runtime = Arc::new(ServiceRuntime::with_config(
        Arc::new(NullHostAdapter),
        ContainerConfig::development(),
    ));
    runtime
        .global()
        .bind_instance(Session { id: 17 })
        .expect("session bind");

    assert!(install(runtime.clone()));
    // Повторная установка не подменяет существующий runtime.
    assert!(!install(Arc::new(ServiceRuntime::new(Arc::new(NullHostAdapter)))));

    let current = try_current().expect("runtime should be installed");
    assert!(Arc::ptr_eq(&current, &runtime));
    assert_eq!(
        current
            .global()
            .get::<Session>()
            .expect("session visible")
            .id,
        17
    );
}
