//! Tests for the module loading flow
//!
//! These exercise the manager, the batch loader and the resolvers
//! together through a real event manager.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        core::{
            event::{LOAD_MODULE, LOAD_MODULES, LOAD_MODULES_POST, LOAD_MODULE_RESOLVE},
            LoaderError, LoaderResult, ModuleEvent, ModuleInstance,
        },
        event::{EventManager, SharedEventManager, DEFAULT_PRIORITY},
        module::{BatchLoader, FactoryResolver, ModuleEntry, ModuleManager, ResolutionState},
    };

    type Log = Arc<Mutex<Vec<String>>>;

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Event manager whose resolver hands out `instances` by name and
    /// records every event it sees as `event:module`
    fn create_events(instances: Vec<(&'static str, ModuleInstance)>) -> (Arc<EventManager>, Log) {
        let events = Arc::new(EventManager::new());
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        for name in [LOAD_MODULES, LOAD_MODULE_RESOLVE, LOAD_MODULE, LOAD_MODULES_POST] {
            let log = log.clone();
            events.attach(
                name,
                move |event: &mut ModuleEvent| {
                    log.lock().unwrap().push(format!(
                        "{}:{}",
                        event.name(),
                        event.module_name().unwrap_or("-")
                    ));
                    Ok(None)
                },
                100,
            );
        }

        events.attach(
            LOAD_MODULE_RESOLVE,
            move |event: &mut ModuleEvent| {
                Ok(instances
                    .iter()
                    .find(|(name, _)| Some(*name) == event.module_name())
                    .map(|(_, module)| module.clone()))
            },
            DEFAULT_PRIORITY,
        );

        (events, log)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_load_module_twice_returns_cached_instance() {
        init_log();
        let a = ModuleInstance::new("a");
        let (events, log) = create_events(vec![("A", a.clone())]);
        let mut manager = ModuleManager::new(["A"], events).unwrap();

        let first = manager.load_module("A").unwrap();
        let second = manager.load_module("A").unwrap();

        assert!(first.ptr_eq(&a));
        assert!(second.ptr_eq(&a));
        assert_eq!(entries(&log), vec!["loadModule.resolve:A", "loadModule:A"]);
        assert_eq!(manager.resolution_state(), ResolutionState::Complete);
    }

    #[test]
    fn test_load_modules_in_order() {
        init_log();
        let a = ModuleInstance::new("a");
        let b = ModuleInstance::new("b");
        let (events, log) = create_events(vec![("A", a.clone()), ("B", b.clone())]);
        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();

        manager.load_modules().unwrap();

        assert!(manager.is_loaded());
        let loaded = manager.loaded_modules(false).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded["A"].ptr_eq(&a));
        assert!(loaded["B"].ptr_eq(&b));
        assert_eq!(
            entries(&log),
            vec![
                "loadModules:-",
                "loadModule.resolve:A",
                "loadModule:A",
                "loadModule.resolve:B",
                "loadModule:B",
                "loadModules.post:B",
            ]
        );
    }

    #[test]
    fn test_load_modules_is_idempotent() {
        init_log();
        let (events, log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        let mut manager = ModuleManager::new(["A"], events).unwrap();

        manager.load_modules().unwrap();
        let fired = entries(&log).len();
        let before = manager.module("A").unwrap();

        manager.load_modules().unwrap().load_modules().unwrap();

        assert_eq!(entries(&log).len(), fired);
        assert_eq!(manager.loaded_modules(false).unwrap().len(), 1);
        assert!(manager.module("A").unwrap().ptr_eq(&before));
    }

    #[test]
    fn test_unresolvable_module_aborts_batch() {
        init_log();
        let (events, log) = create_events(vec![
            ("A", ModuleInstance::new("a")),
            ("C", ModuleInstance::new("c")),
        ]);
        let mut manager = ModuleManager::new(["A", "Missing", "C"], events).unwrap();

        let result = manager.load_modules().map(|_| ());
        match result {
            Err(LoaderError::ModuleInitialization(name)) => assert_eq!(name, "Missing"),
            other => panic!("expected ModuleInitialization, got {other:?}"),
        }

        assert!(!manager.is_loaded());
        assert!(manager.module("A").is_some());
        assert!(manager.module("Missing").is_none());
        // nothing after the failing module is attempted
        assert!(manager.module("C").is_none());
        assert!(!entries(&log).iter().any(|e| e.ends_with(":C")));
        assert!(!entries(&log).iter().any(|e| e.starts_with("loadModules.post")));
        assert_eq!(manager.resolution_state(), ResolutionState::InProgress);
    }

    #[test]
    fn test_load_module_failure_leaves_cache_untouched() {
        init_log();
        let (events, _log) = create_events(Vec::new());
        let mut manager = ModuleManager::new(Vec::<ModuleEntry>::new(), events).unwrap();

        let err = manager.load_module("Ghost").unwrap_err();
        assert_eq!(err.to_string(), "Module (Ghost) could not be initialized");
        assert!(manager.loaded_modules(false).unwrap().is_empty());
    }

    #[test]
    fn test_listener_error_propagates() {
        init_log();
        let (events, _log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        events.attach(
            LOAD_MODULE,
            |_event: &mut ModuleEvent| Err(LoaderError::Listener("rejected".to_string())),
            DEFAULT_PRIORITY,
        );
        let mut manager = ModuleManager::new(["A"], events).unwrap();

        let result = manager.load_modules().map(|_| ());
        assert!(matches!(result, Err(LoaderError::Listener(_))));
        assert!(manager.module("A").is_none());
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_module_lookup_never_resolves() {
        init_log();
        let a = ModuleInstance::new("a");
        let (events, log) = create_events(vec![("X", a.clone())]);
        let mut manager = ModuleManager::new(["X"], events).unwrap();

        assert!(manager.module("X").is_none());
        assert!(entries(&log).is_empty());

        manager.load_module("X").unwrap();
        assert!(manager.module("X").unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_loaded_modules_force_load() {
        init_log();
        let (events, _log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        let mut manager = ModuleManager::new(["A"], events).unwrap();

        assert!(manager.loaded_modules(false).unwrap().is_empty());
        assert_eq!(manager.loaded_modules(true).unwrap().len(), 1);
        assert!(manager.is_loaded());
    }

    #[test]
    fn test_set_modules_rejects_invalid_list() {
        init_log();
        let (events, _log) = create_events(Vec::new());
        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();

        let result = manager.set_modules(["C", "not valid"]);
        assert!(matches!(result, Err(LoaderError::InvalidArgument(_))));
        assert_eq!(manager.module_names(), vec!["A", "B"]);

        manager.set_modules(vec!["C".to_string()]).unwrap();
        assert_eq!(manager.module_names(), vec!["C"]);
    }

    #[test]
    fn test_failed_resolution_does_not_alter_captured_event() {
        init_log();
        let b = ModuleInstance::new("b");
        let (events, _log) = create_events(vec![("B", b.clone())]);

        let captured: Arc<Mutex<Vec<ModuleEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        events.attach(
            LOAD_MODULE_RESOLVE,
            move |event: &mut ModuleEvent| {
                event.set_param("seen_by", "capture".to_string());
                sink.lock().unwrap().push(event.clone());
                Ok(None)
            },
            50,
        );

        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();
        manager.event_mut().set_param("env", "test".to_string());

        assert!(manager.load_module("A").is_err());
        assert_eq!(manager.resolution_state(), ResolutionState::InProgress);

        let loaded = manager.load_module("B").unwrap();
        assert!(loaded.ptr_eq(&b));

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].module_name(), Some("A"));
        assert!(captured[0].module().is_none());
        assert_eq!(captured[1].module_name(), Some("B"));

        // the fresh event keeps caller params
        assert_eq!(manager.event().param_str("env"), Some("test"));
        assert_eq!(manager.event().module_name(), Some("B"));
        assert!(manager.event().module().unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_failed_resolution_params_do_not_reach_next_module() {
        init_log();
        let b = ModuleInstance::new("b");
        let (events, _log) = create_events(vec![("B", b.clone())]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.attach(
            LOAD_MODULE_RESOLVE,
            move |event: &mut ModuleEvent| {
                sink.lock().unwrap().push(event.param_str("half_built").map(String::from));
                if event.module_name() == Some("A") {
                    event.set_param("half_built", "A-state".to_string());
                }
                Ok(None)
            },
            50,
        );

        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();
        manager.event_mut().set_param("env", "test".to_string());

        assert!(manager.load_module("A").is_err());
        assert_eq!(manager.event().param_str("half_built"), Some("A-state"));

        assert!(manager.load_module("B").unwrap().ptr_eq(&b));
        assert_eq!(*seen.lock().unwrap(), vec![None, None]);
        assert!(!manager.event().has_param("half_built"));
        assert_eq!(manager.event().param_str("env"), Some("test"));
        assert_eq!(manager.resolution_state(), ResolutionState::Complete);
    }

    #[test]
    fn test_params_from_completed_resolution_are_kept() {
        init_log();
        let (events, _log) = create_events(vec![
            ("A", ModuleInstance::new("a")),
            ("B", ModuleInstance::new("b")),
        ]);
        events.attach(
            LOAD_MODULE,
            |event: &mut ModuleEvent| {
                if event.module_name() == Some("A") {
                    event.set_param("after_a", true);
                }
                Ok(None)
            },
            DEFAULT_PRIORITY,
        );
        events.attach(
            LOAD_MODULE_RESOLVE,
            |event: &mut ModuleEvent| {
                if event.module_name() == Some("C") {
                    event.set_param("half_built", true);
                }
                Ok(None)
            },
            50,
        );

        let mut manager = ModuleManager::new(["A", "B", "C"], events).unwrap();
        manager.load_module("A").unwrap();
        assert!(manager.load_module("C").is_err());
        manager.load_module("B").unwrap();

        assert_eq!(manager.event().param::<bool>("after_a"), Some(&true));
        assert!(!manager.event().has_param("half_built"));
    }

    #[test]
    fn test_failing_post_listener_is_not_retried() {
        init_log();
        let (events, log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        events.attach(
            LOAD_MODULES_POST,
            |_event: &mut ModuleEvent| Err(LoaderError::Listener("post failed".to_string())),
            DEFAULT_PRIORITY,
        );

        let mut manager = ModuleManager::new(["A"], events).unwrap();
        assert!(matches!(
            manager.load_modules().map(|_| ()),
            Err(LoaderError::Listener(_))
        ));
        assert!(manager.is_loaded());
        assert!(manager.module("A").is_some());

        log.lock().unwrap().clear();
        manager.load_modules().unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_batch_can_resume_after_failure() {
        init_log();
        let (events, _log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        let mut manager = ModuleManager::new(["A", "B"], events.clone()).unwrap();

        assert!(manager.load_modules().is_err());

        let b = ModuleInstance::new("b");
        let late = b.clone();
        events.attach(
            LOAD_MODULE_RESOLVE,
            move |event: &mut ModuleEvent| {
                Ok((event.module_name() == Some("B")).then(|| late.clone()))
            },
            DEFAULT_PRIORITY,
        );

        manager.load_modules().unwrap();
        assert!(manager.is_loaded());
        assert!(manager.module("B").unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_higher_priority_resolver_wins() {
        init_log();
        let default = ModuleInstance::new("default");
        let (events, _log) = create_events(vec![("A", default)]);

        let preferred = ModuleInstance::new("preferred");
        let handed_out = preferred.clone();
        events.attach(
            LOAD_MODULE_RESOLVE,
            move |_event: &mut ModuleEvent| Ok(Some(handed_out.clone())),
            10,
        );

        let mut manager = ModuleManager::new(["A"], events).unwrap();
        assert!(manager.load_module("A").unwrap().ptr_eq(&preferred));
    }

    #[test]
    fn test_preloaded_instances_in_batch() {
        init_log();
        let a = ModuleInstance::new("a");
        let stats = ModuleInstance::new("stats");
        let (events, log) = create_events(vec![("A", a.clone())]);

        let modules = vec![ModuleEntry::from("A"), ModuleEntry::instance("Stats", stats.clone())];
        let mut manager = ModuleManager::new(modules, events).unwrap();
        manager.load_modules().unwrap();

        assert!(manager.module("Stats").unwrap().ptr_eq(&stats));
        assert!(entries(&log).contains(&"loadModule:Stats".to_string()));
        assert!(!entries(&log).contains(&"loadModule.resolve:Stats".to_string()));
    }

    struct ReverseBatchLoader;

    impl BatchLoader for ReverseBatchLoader {
        fn load(&self, manager: &mut ModuleManager) -> LoaderResult<()> {
            let entries = manager.modules().to_vec();
            for entry in entries.iter().rev() {
                manager.load_entry(entry)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_custom_batch_loader() {
        init_log();
        let (events, log) = create_events(vec![
            ("A", ModuleInstance::new("a")),
            ("B", ModuleInstance::new("b")),
        ]);
        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();
        manager.set_batch_loader(Arc::new(ReverseBatchLoader));

        manager.load_modules().unwrap();

        let resolved: Vec<String> = entries(&log)
            .into_iter()
            .filter(|e| e.starts_with("loadModule:"))
            .collect();
        assert_eq!(resolved, vec!["loadModule:B", "loadModule:A"]);
        assert!(manager.is_loaded());
    }

    #[test]
    fn test_post_listener_sees_every_module() {
        init_log();
        let (events, _log) = create_events(vec![
            ("A", ModuleInstance::new("a")),
            ("B", ModuleInstance::new("b")),
        ]);

        let counted = Arc::new(Mutex::new(Vec::new()));
        let sink = counted.clone();
        events.attach(
            LOAD_MODULE,
            move |event: &mut ModuleEvent| {
                sink.lock()
                    .unwrap()
                    .push(event.module_name().unwrap_or_default().to_string());
                Ok(None)
            },
            DEFAULT_PRIORITY,
        );
        let seen = counted.clone();
        events.attach(
            LOAD_MODULES_POST,
            move |_event: &mut ModuleEvent| {
                assert_eq!(*seen.lock().unwrap(), vec!["A", "B"]);
                Ok(None)
            },
            DEFAULT_PRIORITY,
        );

        let mut manager = ModuleManager::new(["A", "B"], events).unwrap();
        manager.load_modules().unwrap();
    }

    #[test]
    fn test_factory_resolver_with_fallback() {
        init_log();
        fn create_album(_cfg: serde_yaml::Value) -> LoaderResult<ModuleInstance> {
            Ok(ModuleInstance::new("album"))
        }

        let (events, _log) = create_events(vec![("Fallback", ModuleInstance::new("fb"))]);
        let resolver = Arc::new(FactoryResolver::new());
        resolver.register_factory("Album", create_album);
        resolver.attach_to(&events, 10);

        let mut manager = ModuleManager::new(["Album", "Fallback"], events).unwrap();
        manager.load_modules().unwrap();

        assert_eq!(
            manager.module("Album").unwrap().downcast_ref::<&str>(),
            Some(&"album")
        );
        assert_eq!(
            manager.module("Fallback").unwrap().downcast_ref::<&str>(),
            Some(&"fb")
        );
    }

    #[test]
    fn test_shared_listener_observes_manager() {
        init_log();
        let shared = Arc::new(SharedEventManager::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        shared.attach(
            "ModuleManager",
            LOAD_MODULE,
            move |event: &mut ModuleEvent| {
                sink.lock()
                    .unwrap()
                    .push(event.module_name().unwrap_or_default().to_string());
                Ok(None)
            },
            DEFAULT_PRIORITY,
        );

        let events = Arc::new(EventManager::with_shared_manager(shared));
        let module = ModuleInstance::new("a");
        let handed_out = module.clone();
        events.attach(
            LOAD_MODULE_RESOLVE,
            move |_event: &mut ModuleEvent| Ok(Some(handed_out.clone())),
            DEFAULT_PRIORITY,
        );

        let mut manager = ModuleManager::new(["A"], events).unwrap();
        manager.load_modules().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A"]);
    }

    #[test]
    fn test_load_modules_listener_can_stash_params() {
        init_log();
        let (events, _log) = create_events(vec![("A", ModuleInstance::new("a"))]);
        events.attach(
            LOAD_MODULES,
            |event: &mut ModuleEvent| {
                event.set_param("started", true);
                Ok(None)
            },
            DEFAULT_PRIORITY,
        );
        events.attach(
            LOAD_MODULE_RESOLVE,
            |event: &mut ModuleEvent| {
                assert_eq!(event.param::<bool>("started"), Some(&true));
                Ok(None)
            },
            50,
        );

        let mut manager = ModuleManager::new(["A"], events).unwrap();
        manager.load_modules().unwrap();
    }
}
