//! Per-element widget instance registry
//!
//! The registry is a side-table owned by the widget layer: for every widget
//! type it maps element handles to that type's instance. At most one instance
//! of a given type is registered per element, while instances of different
//! types on the same element never interfere.
//!
//! ```text
//! WidgetRegistry
//!   TypeId(Toggle)       _Toggle1712345678901       { el#3 → Toggle, el#7 → Toggle }
//!   TypeId(ToggleButton) _ToggleButton1712345678904 { el#4 → ToggleButton }
//! ```
//!
//! Element handles are generational, so instances of removed elements can be
//! found and dropped with [`WidgetRegistry::prune`].

use std::any::{Any, TypeId};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use tether_dom::{Document, ElementId};

use crate::config::RegistryConfig;
use crate::error::{WidgetError, WidgetResult};
use crate::widget::{InstanceKey, Widget, WidgetClass};

/// Source of key timestamps, in milliseconds
pub type Clock = Box<dyn Fn() -> u64>;

fn system_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Instances of one widget type
struct InstanceTable {
    key: InstanceKey,
    instances: FxHashMap<ElementId, Box<dyn Any>>,
}

/// Counts from one [`WidgetRegistry::init_all`] pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitReport {
    /// New instances constructed and registered
    pub created: usize,
    /// Existing instances refreshed in place
    pub refreshed: usize,
}

/// Side-table from (widget type, element) to widget instance
pub struct WidgetRegistry {
    config: RegistryConfig,
    clock: Clock,
    tables: FxHashMap<TypeId, InstanceTable>,
    /// Declared names, for uniqueness checks
    names: FxHashMap<&'static str, TypeId>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            clock: Box::new(system_clock),
            tables: FxHashMap::default(),
            names: FxHashMap::default(),
        }
    }

    /// Replace the timestamp source used for new instance keys
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> u64 + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Registry key of widget type `W`
    ///
    /// Computed on first use and memoized; later calls return the same key.
    pub fn instance_key<W: Widget>(&mut self) -> WidgetResult<InstanceKey> {
        Ok(self.table_mut::<W>()?.key.clone())
    }

    /// Key of `W` if the type has been used by this registry
    pub fn peek_instance_key<W: Widget>(&self) -> Option<&InstanceKey> {
        self.tables.get(&TypeId::of::<W>()).map(|t| &t.key)
    }

    fn check_name<W: Widget>(&mut self, type_id: TypeId) -> WidgetResult<()> {
        match self.names.get(W::NAME).copied() {
            Some(other) if other != type_id => {
                if self.config.strict_names {
                    return Err(WidgetError::DuplicateName { name: W::NAME });
                }
                tracing::warn!(
                    "Widget name '{}' is shared by several widget types; keys may look alike",
                    W::NAME
                );
            }
            Some(_) => {}
            None => {
                self.names.insert(W::NAME, type_id);
            }
        }
        Ok(())
    }

    fn table_mut<W: Widget>(&mut self) -> WidgetResult<&mut InstanceTable> {
        let type_id = TypeId::of::<W>();
        if !self.tables.contains_key(&type_id) {
            self.check_name::<W>(type_id)?;
        }

        let clock = &self.clock;
        Ok(self.tables.entry(type_id).or_insert_with(|| {
            let key = InstanceKey::new(W::NAME, clock());
            tracing::debug!("registered widget type {} as {}", W::NAME, key);
            InstanceTable {
                key,
                instances: FxHashMap::default(),
            }
        }))
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Instance of `W` registered on `element`, if any
    pub fn get_instance<W: Widget>(&self, element: ElementId) -> Option<&W> {
        self.tables
            .get(&TypeId::of::<W>())?
            .instances
            .get(&element)?
            .downcast_ref::<W>()
    }

    pub fn get_instance_mut<W: Widget>(&mut self, element: ElementId) -> Option<&mut W> {
        self.tables
            .get_mut(&TypeId::of::<W>())?
            .instances
            .get_mut(&element)?
            .downcast_mut::<W>()
    }

    pub fn has_instance<W: Widget>(&self, element: ElementId) -> bool {
        self.get_instance::<W>(element).is_some()
    }

    /// Register `instance` on `element`
    ///
    /// Overwrites unconditionally; a displaced instance is returned without
    /// having `destroy` called on it.
    pub fn set_instance<W: Widget>(
        &mut self,
        element: ElementId,
        instance: W,
    ) -> WidgetResult<Option<W>> {
        let previous = self
            .table_mut::<W>()?
            .instances
            .insert(element, Box::new(instance));
        Ok(previous.and_then(|b| b.downcast::<W>().ok()).map(|b| *b))
    }

    /// Unregister the instance of `W` on `element`
    ///
    /// Absence is not an error; `None` is returned.
    pub fn delete_instance<W: Widget>(&mut self, element: ElementId) -> Option<W> {
        self.tables
            .get_mut(&TypeId::of::<W>())?
            .instances
            .remove(&element)
            .and_then(|b| b.downcast::<W>().ok())
            .map(|b| *b)
    }

    /// All registered instances of `W`, in no particular order
    pub fn instances<W: Widget>(&self) -> impl Iterator<Item = (ElementId, &W)> + '_ {
        self.tables
            .get(&TypeId::of::<W>())
            .into_iter()
            .flat_map(|t| t.instances.iter())
            .filter_map(|(el, b)| b.downcast_ref::<W>().map(|w| (*el, w)))
    }

    /// Number of registered instances of `W`
    pub fn count<W: Widget>(&self) -> usize {
        self.tables
            .get(&TypeId::of::<W>())
            .map(|t| t.instances.len())
            .unwrap_or(0)
    }

    /// Total number of registered instances across all widget types
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.instances.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Subtree lifecycle
    // =========================================================================

    /// Attach or refresh every `W` inside `root`
    ///
    /// Elements from [`WidgetClass::find_all`] that already have an instance
    /// get `refresh` called once; the others get a new instance from
    /// [`WidgetClass::create_instance`]. Elements are visited in the order
    /// `find_all` returns them.
    pub fn init_all<W: WidgetClass>(
        &mut self,
        document: &mut Document,
        root: ElementId,
    ) -> WidgetResult<InitReport> {
        if self.config.prune_on_init {
            self.prune(document);
        }

        let elements = W::find_all(document, root)?;
        let mut report = InitReport::default();

        for element in elements {
            if let Some(instance) = self.get_instance_mut::<W>(element) {
                tracing::trace!("refreshing {} on {:?}", W::NAME, element);
                instance.refresh(document);
                report.refreshed += 1;
                continue;
            }

            tracing::trace!("creating {} on {:?}", W::NAME, element);
            let instance = W::create_instance(document, element)?;
            self.set_instance(element, instance)?;
            report.created += 1;
        }

        tracing::debug!(
            "init_all {}: {} created, {} refreshed",
            W::NAME,
            report.created,
            report.refreshed
        );
        Ok(report)
    }

    /// Destroy and unregister every `W` inside `root`
    ///
    /// `destroy` runs before the instance leaves the registry. Elements
    /// without an instance are skipped. Returns the number of instances
    /// removed.
    pub fn delete_all<W: WidgetClass>(
        &mut self,
        document: &mut Document,
        root: ElementId,
    ) -> WidgetResult<usize> {
        let elements = W::find_all(document, root)?;
        let mut removed = 0;

        for element in elements {
            let Some(instance) = self.get_instance_mut::<W>(element) else {
                continue;
            };

            tracing::trace!("destroying {} on {:?}", W::NAME, element);
            instance.destroy(document);
            self.delete_instance::<W>(element);
            removed += 1;
        }

        tracing::debug!("delete_all {}: {} removed", W::NAME, removed);
        Ok(removed)
    }

    /// Drop instances whose element no longer exists in `document`
    ///
    /// `destroy` is not called: the element and its listeners are already
    /// gone. Returns the number of instances dropped.
    pub fn prune(&mut self, document: &Document) -> usize {
        let mut dropped = 0;
        for table in self.tables.values_mut() {
            let before = table.instances.len();
            table.instances.retain(|&el, _| document.contains(el));
            let gone = before - table.instances.len();
            if gone > 0 {
                tracing::debug!("pruned {} stale instance(s) keyed {}", gone, table.key);
            }
            dropped += gone;
        }
        dropped
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.tables.values().map(|t| t.key.to_string()).collect();
        keys.sort();
        f.debug_struct("WidgetRegistry")
            .field("config", &self.config)
            .field("keys", &keys)
            .field("instances", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    thread_local! {
        static CONSTRUCTED: Cell<u32> = const { Cell::new(0) };
    }

    fn constructed() -> u32 {
        CONSTRUCTED.with(|c| c.get())
    }

    /// Counts its own lifecycle calls
    struct Probe {
        element: ElementId,
        serial: u32,
        refreshed: Rc<Cell<u32>>,
        destroyed: Rc<Cell<u32>>,
    }

    impl Widget for Probe {
        const NAME: &'static str = "Probe";

        fn element(&self) -> Option<ElementId> {
            Some(self.element)
        }

        fn refresh(&mut self, _document: &mut Document) {
            self.refreshed.set(self.refreshed.get() + 1);
        }

        fn destroy(&mut self, _document: &mut Document) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    impl WidgetClass for Probe {
        fn find_all(document: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
            Ok(document.query_selector_all(root, "[data-probe]")?)
        }

        fn from_element(element: ElementId) -> Option<Self> {
            let serial = CONSTRUCTED.with(|c| {
                c.set(c.get() + 1);
                c.get()
            });
            Some(Probe {
                element,
                serial,
                refreshed: Rc::new(Cell::new(0)),
                destroyed: Rc::new(Cell::new(0)),
            })
        }
    }

    /// A second widget type that applies to the same elements
    struct Other {
        element: ElementId,
    }

    impl Widget for Other {
        const NAME: &'static str = "Other";

        fn element(&self) -> Option<ElementId> {
            Some(self.element)
        }
    }

    impl WidgetClass for Other {
        fn find_all(document: &Document, root: ElementId) -> WidgetResult<Vec<ElementId>> {
            Ok(document.query_selector_all(root, "[data-probe]")?)
        }

        fn from_element(element: ElementId) -> Option<Self> {
            Some(Other { element })
        }
    }

    /// Declares a name already taken by `Probe`
    struct Impostor;

    impl Widget for Impostor {
        const NAME: &'static str = "Probe";

        fn element(&self) -> Option<ElementId> {
            None
        }
    }

    /// Never overrides `find_all`
    struct Unlocated;

    impl Widget for Unlocated {
        const NAME: &'static str = "Unlocated";

        fn element(&self) -> Option<ElementId> {
            None
        }
    }

    impl WidgetClass for Unlocated {
        fn from_element(_element: ElementId) -> Option<Self> {
            Some(Unlocated)
        }
    }

    fn document() -> (Document, ElementId, ElementId, ElementId) {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div").unwrap();
        doc.set_attribute(a, "data-probe", "").unwrap();
        let b = doc.append_element(a, "span").unwrap();
        doc.set_attribute(b, "data-probe", "").unwrap();
        let plain = doc.append_element(root, "p").unwrap();
        (doc, a, b, plain)
    }

    #[test]
    fn test_init_all_creates_instances() {
        let (mut doc, a, b, plain) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        let before = constructed();

        let report = registry.init_all::<Probe>(&mut doc, root).unwrap();

        assert_eq!(report, InitReport { created: 2, refreshed: 0 });
        assert_eq!(constructed() - before, 2);
        assert_eq!(registry.get_instance::<Probe>(a).unwrap().element, a);
        assert_eq!(registry.get_instance::<Probe>(b).unwrap().element, b);
        assert!(registry.get_instance::<Probe>(plain).is_none());

        let a_probe = registry.get_instance::<Probe>(a).unwrap();
        assert_eq!(a_probe.refreshed.get(), 0);
        assert_eq!(a_probe.destroyed.get(), 0);
    }

    #[test]
    fn test_init_all_refreshes_existing() {
        let (mut doc, a, _, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        registry.init_all::<Probe>(&mut doc, root).unwrap();
        let serial = registry.get_instance::<Probe>(a).unwrap().serial;
        let before = constructed();

        let report = registry.init_all::<Probe>(&mut doc, root).unwrap();

        assert_eq!(report, InitReport { created: 0, refreshed: 2 });
        assert_eq!(constructed(), before);
        let probe = registry.get_instance::<Probe>(a).unwrap();
        assert_eq!(probe.serial, serial);
        assert_eq!(probe.refreshed.get(), 1);
    }

    #[test]
    fn test_init_all_mixed_new_and_existing() {
        let (mut doc, a, _, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        registry.init_all::<Probe>(&mut doc, a).unwrap();

        // `a` is the scan root, so only its descendant was attached
        assert_eq!(registry.count::<Probe>(), 1);

        let report = registry.init_all::<Probe>(&mut doc, root).unwrap();
        assert_eq!(report, InitReport { created: 1, refreshed: 1 });
    }

    #[test]
    fn test_delete_all_destroys_then_unregisters() {
        let (mut doc, a, b, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        registry.init_all::<Probe>(&mut doc, root).unwrap();
        let destroyed_a = Rc::clone(&registry.get_instance::<Probe>(a).unwrap().destroyed);
        let destroyed_b = Rc::clone(&registry.get_instance::<Probe>(b).unwrap().destroyed);

        let removed = registry.delete_all::<Probe>(&mut doc, root).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(destroyed_a.get(), 1);
        assert_eq!(destroyed_b.get(), 1);
        assert!(registry.get_instance::<Probe>(a).is_none());
        assert!(registry.get_instance::<Probe>(b).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delete_all_skips_unregistered() {
        let (mut doc, a, b, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        let probe = Probe::from_element(b).unwrap();
        let destroyed = Rc::clone(&probe.destroyed);
        registry.set_instance(b, probe).unwrap();

        let removed = registry.delete_all::<Probe>(&mut doc, root).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(destroyed.get(), 1);
        assert!(!registry.has_instance::<Probe>(a));

        // Nothing left: a second pass is a no-op
        assert_eq!(registry.delete_all::<Probe>(&mut doc, root).unwrap(), 0);
    }

    #[test]
    fn test_distinct_types_do_not_collide() {
        let (mut doc, a, _, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();

        registry.set_instance(a, Probe::from_element(a).unwrap()).unwrap();
        registry.set_instance(a, Other::from_element(a).unwrap()).unwrap();
        assert!(registry.has_instance::<Probe>(a));
        assert!(registry.has_instance::<Other>(a));

        registry.delete_instance::<Other>(a);
        assert!(registry.has_instance::<Probe>(a));
        assert!(!registry.has_instance::<Other>(a));

        registry.init_all::<Other>(&mut doc, root).unwrap();
        registry.delete_all::<Probe>(&mut doc, root).unwrap();
        assert!(!registry.has_instance::<Probe>(a));
        assert!(registry.has_instance::<Other>(a));
    }

    #[test]
    fn test_set_instance_overwrites() {
        let (_, a, _, _) = document();
        let mut registry = WidgetRegistry::new();

        let first = Probe::from_element(a).unwrap();
        let first_serial = first.serial;
        assert!(registry.set_instance(a, first).unwrap().is_none());

        let second = Probe::from_element(a).unwrap();
        let second_serial = second.serial;
        let displaced = registry.set_instance(a, second).unwrap().unwrap();

        assert_eq!(displaced.serial, first_serial);
        assert_eq!(registry.get_instance::<Probe>(a).unwrap().serial, second_serial);
        assert_eq!(registry.count::<Probe>(), 1);
    }

    #[test]
    fn test_delete_instance_absent_is_silent() {
        let (_, a, _, _) = document();
        let mut registry = WidgetRegistry::new();

        assert!(registry.delete_instance::<Probe>(a).is_none());
        registry.set_instance(a, Probe::from_element(a).unwrap()).unwrap();
        assert!(registry.delete_instance::<Probe>(a).is_some());
        assert!(registry.delete_instance::<Probe>(a).is_none());
    }

    #[test]
    fn test_instance_key_memoized() {
        let ticks = Rc::new(Cell::new(1_000u64));
        let t = Rc::clone(&ticks);
        let mut registry = WidgetRegistry::new().with_clock(move || {
            t.set(t.get() + 1);
            t.get()
        });

        let key = registry.instance_key::<Probe>().unwrap();
        assert_eq!(key.to_string(), "_Probe1001");
        assert_eq!(registry.instance_key::<Probe>().unwrap(), key);
        assert_eq!(ticks.get(), 1001);

        let other = registry.instance_key::<Other>().unwrap();
        assert_eq!(other.to_string(), "_Other1002");
        assert_ne!(other, key);
        assert_eq!(registry.peek_instance_key::<Probe>(), Some(&key));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = WidgetRegistry::new();
        registry.instance_key::<Probe>().unwrap();

        let err = registry.instance_key::<Impostor>().unwrap_err();
        assert!(matches!(err, WidgetError::DuplicateName { name: "Probe" }));
    }

    #[test]
    fn test_duplicate_name_allowed_when_not_strict() {
        let config = RegistryConfig {
            strict_names: false,
            ..RegistryConfig::default()
        };
        let mut registry = WidgetRegistry::with_config(config);
        let (_, a, _, _) = document();

        registry.set_instance(a, Probe::from_element(a).unwrap()).unwrap();
        registry.set_instance(a, Impostor).unwrap();

        // Still separate tables
        assert!(registry.has_instance::<Probe>(a));
        assert!(registry.has_instance::<Impostor>(a));
    }

    #[test]
    fn test_find_all_not_implemented_surfaces() {
        let mut doc = Document::new();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();

        let err = registry
            .init_all::<Unlocated>(&mut doc, root)
            .unwrap_err();
        assert!(matches!(err, WidgetError::NotImplemented { .. }));
        assert!(matches!(
            registry.delete_all::<Unlocated>(&mut doc, root),
            Err(WidgetError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_prune_drops_removed_elements() {
        let (mut doc, a, b, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        registry.init_all::<Probe>(&mut doc, root).unwrap();
        let destroyed = Rc::clone(&registry.get_instance::<Probe>(b).unwrap().destroyed);

        doc.remove(b).unwrap();
        assert_eq!(registry.prune(&doc), 1);

        assert!(registry.has_instance::<Probe>(a));
        assert_eq!(registry.count::<Probe>(), 1);
        assert_eq!(destroyed.get(), 0);
    }

    #[test]
    fn test_prune_on_init() {
        let config = RegistryConfig {
            prune_on_init: true,
            ..RegistryConfig::default()
        };
        let (mut doc, a, b, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::with_config(config);
        registry.init_all::<Probe>(&mut doc, root).unwrap();

        doc.remove(b).unwrap();
        registry.init_all::<Probe>(&mut doc, root).unwrap();

        assert_eq!(registry.count::<Probe>(), 1);
        assert!(registry.has_instance::<Probe>(a));
    }

    #[test]
    fn test_instances_iterator() {
        let (mut doc, a, b, _) = document();
        let root = doc.root();
        let mut registry = WidgetRegistry::new();
        registry.init_all::<Probe>(&mut doc, root).unwrap();

        let mut elements: Vec<ElementId> = registry.instances::<Probe>().map(|(e, _)| e).collect();
        elements.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(elements, expected);
        assert_eq!(registry.instances::<Other>().count(), 0);
    }
}
