//! Process-wide table of logical windows.
//!
//! One slot per [`WindowName`], created at startup in the `Absent` state.
//! The slot is the only owner of the window's surface id; only the
//! lifecycle controller and the shutdown coordinator mutate it.

use crate::options::WindowName;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// No surface exists.
    Absent,
    /// A surface exists but was fake-closed.
    Hidden,
    Visible,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Absent => "absent",
            Visibility::Hidden => "hidden",
            Visibility::Visible => "visible",
        }
    }
}

/// Callback fired with the window's name and surface.
pub type Observer = Box<dyn FnMut(WindowName, SurfaceId)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ObserverKind {
    Create,
    Close,
}

/// Handle returned by observer registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u32,
    name: WindowName,
    kind: ObserverKind,
}

impl Subscription {
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Observers invoked in registration order.
#[derive(Default)]
struct ObserverList {
    entries: Vec<(u32, Observer)>,
}

impl ObserverList {
    fn push(&mut self, id: u32, observer: Observer) {
        self.entries.push((id, observer));
    }

    fn remove(&mut self, id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    fn notify(&mut self, name: WindowName, surface: SurfaceId) {
        for (_, observer) in self.entries.iter_mut() {
            observer(name, surface);
        }
    }
}

struct WindowSlot {
    instance: Option<SurfaceId>,
    visibility: Visibility,
    /// Number of surfaces ever created for this name.
    created: u32,
    on_create: ObserverList,
    on_close: ObserverList,
}

impl WindowSlot {
    fn new() -> Self {
        Self {
            instance: None,
            visibility: Visibility::Absent,
            created: 0,
            on_create: ObserverList::default(),
            on_close: ObserverList::default(),
        }
    }
}

pub struct WindowRegistry {
    slots: [WindowSlot; WindowName::COUNT],
    next_subscription: u32,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| WindowSlot::new()),
            next_subscription: 1,
        }
    }

    fn slot(&self, name: WindowName) -> &WindowSlot {
        &self.slots[name.index()]
    }

    fn slot_mut(&mut self, name: WindowName) -> &mut WindowSlot {
        &mut self.slots[name.index()]
    }

    // ---- Queries ----

    /// The visible surface for `name`, `None` when hidden or absent.
    pub fn get(&self, name: WindowName) -> Option<SurfaceId> {
        let slot = self.slot(name);
        match slot.visibility {
            Visibility::Visible => slot.instance,
            _ => None,
        }
    }

    /// The surface for `name` regardless of visibility.
    pub fn instance(&self, name: WindowName) -> Option<SurfaceId> {
        self.slot(name).instance
    }

    /// Reverse lookup by surface identity.
    pub fn get_name(&self, surface: SurfaceId) -> Option<WindowName> {
        WindowName::ALL
            .into_iter()
            .find(|name| self.slot(*name).instance == Some(surface))
    }

    pub fn is_hidden(&self, name: WindowName) -> bool {
        self.slot(name).visibility == Visibility::Hidden
    }

    pub fn visibility(&self, name: WindowName) -> Visibility {
        self.slot(name).visibility
    }

    /// Whether a surface was ever created for `name` in this process.
    pub fn ever_created(&self, name: WindowName) -> bool {
        self.slot(name).created > 0
    }

    // ---- Mutations ----

    /// Record a freshly created surface as the visible instance.
    pub(crate) fn insert(&mut self, name: WindowName, surface: SurfaceId) {
        let slot = self.slot_mut(name);
        debug_assert!(slot.instance.is_none(), "{} already has a live surface", name);
        slot.instance = Some(surface);
        slot.visibility = Visibility::Visible;
        slot.created += 1;
    }

    pub(crate) fn mark_visible(&mut self, name: WindowName) {
        let slot = self.slot_mut(name);
        if slot.instance.is_some() {
            slot.visibility = Visibility::Visible;
        }
    }

    pub(crate) fn mark_hidden(&mut self, name: WindowName) {
        let slot = self.slot_mut(name);
        if slot.instance.is_some() {
            slot.visibility = Visibility::Hidden;
        }
    }

    /// Drop the instance for `name`, returning it.
    pub(crate) fn clear(&mut self, name: WindowName) -> Option<SurfaceId> {
        let slot = self.slot_mut(name);
        slot.visibility = Visibility::Absent;
        slot.instance.take()
    }

    /// Drop the instance for `name` only if it is still `surface`.
    pub(crate) fn clear_if(&mut self, name: WindowName, surface: SurfaceId) -> bool {
        if self.slot(name).instance == Some(surface) {
            self.clear(name);
            true
        } else {
            false
        }
    }

    // ---- Observers ----

    pub(crate) fn register_on_create(&mut self, name: WindowName, observer: Observer) -> Subscription {
        let id = self.allocate_subscription();
        self.slot_mut(name).on_create.push(id, observer);
        Subscription {
            id,
            name,
            kind: ObserverKind::Create,
        }
    }

    pub(crate) fn register_on_close(&mut self, name: WindowName, observer: Observer) -> Subscription {
        let id = self.allocate_subscription();
        self.slot_mut(name).on_close.push(id, observer);
        Subscription {
            id,
            name,
            kind: ObserverKind::Close,
        }
    }

    pub(crate) fn unregister(&mut self, subscription: Subscription) -> bool {
        let slot = self.slot_mut(subscription.name);
        match subscription.kind {
            ObserverKind::Create => slot.on_create.remove(subscription.id),
            ObserverKind::Close => slot.on_close.remove(subscription.id),
        }
    }

    /// Unregister by raw id, for callers that only kept the number.
    pub(crate) fn unregister_id(&mut self, id: u32) -> bool {
        self.slots
            .iter_mut()
            .any(|slot| slot.on_create.remove(id) || slot.on_close.remove(id))
    }

    pub(crate) fn notify_created(&mut self, name: WindowName, surface: SurfaceId) {
        self.slot_mut(name).on_create.notify(name, surface);
    }

    pub(crate) fn notify_closed(&mut self, name: WindowName, surface: SurfaceId) {
        self.slot_mut(name).on_close.notify(name, surface);
    }

    fn allocate_subscription(&mut self) -> u32 {
        let id = self.next_subscription;
        self.next_subscription = self.next_subscription.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn starts_absent_for_every_name() {
        let registry = WindowRegistry::new();
        for name in WindowName::ALL {
            assert_eq!(registry.visibility(name), Visibility::Absent);
            assert_eq!(registry.get(name), None);
            assert_eq!(registry.instance(name), None);
            assert!(!registry.ever_created(name));
        }
    }

    #[test]
    fn get_hides_fake_closed_instances() {
        let mut registry = WindowRegistry::new();
        registry.insert(WindowName::Setting, 7);
        assert_eq!(registry.get(WindowName::Setting), Some(7));

        registry.mark_hidden(WindowName::Setting);
        assert_eq!(registry.get(WindowName::Setting), None);
        assert_eq!(registry.instance(WindowName::Setting), Some(7));
        assert!(registry.is_hidden(WindowName::Setting));

        registry.mark_visible(WindowName::Setting);
        assert_eq!(registry.get(WindowName::Setting), Some(7));
    }

    #[test]
    fn hidden_requires_an_instance() {
        let mut registry = WindowRegistry::new();
        registry.mark_hidden(WindowName::Dialog);
        assert_eq!(registry.visibility(WindowName::Dialog), Visibility::Absent);
    }

    #[test]
    fn reverse_lookup_by_identity() {
        let mut registry = WindowRegistry::new();
        registry.insert(WindowName::Main, 1);
        registry.insert(WindowName::Dialog, 4);
        assert_eq!(registry.get_name(4), Some(WindowName::Dialog));
        assert_eq!(registry.get_name(1), Some(WindowName::Main));
        assert_eq!(registry.get_name(99), None);
    }

    #[test]
    fn clear_if_ignores_newer_instances() {
        let mut registry = WindowRegistry::new();
        registry.insert(WindowName::Main, 1);
        registry.clear(WindowName::Main);
        registry.insert(WindowName::Main, 2);

        assert!(!registry.clear_if(WindowName::Main, 1));
        assert_eq!(registry.get(WindowName::Main), Some(2));
        assert!(registry.clear_if(WindowName::Main, 2));
        assert_eq!(registry.visibility(WindowName::Main), Visibility::Absent);
        assert!(registry.ever_created(WindowName::Main));
    }

    #[test]
    fn observers_fire_in_registration_order_and_unregister() {
        let mut registry = WindowRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let log = log.clone();
            registry.register_on_create(
                WindowName::Main,
                Box::new(move |_, id| log.borrow_mut().push(("first", id))),
            )
        };
        {
            let log = log.clone();
            registry.register_on_create(
                WindowName::Main,
                Box::new(move |_, id| log.borrow_mut().push(("second", id))),
            );
        }
        {
            let log = log.clone();
            registry.register_on_close(
                WindowName::Main,
                Box::new(move |_, id| log.borrow_mut().push(("closed", id))),
            );
        }

        registry.notify_created(WindowName::Main, 3);
        assert_eq!(*log.borrow(), vec![("first", 3), ("second", 3)]);

        assert!(registry.unregister(first));
        assert!(!registry.unregister(first));
        registry.notify_created(WindowName::Main, 5);
        registry.notify_closed(WindowName::Main, 5);
        assert_eq!(
            *log.borrow(),
            vec![("first", 3), ("second", 3), ("second", 5), ("closed", 5)]
        );
    }

    #[test]
    fn observers_are_scoped_to_their_window() {
        let mut registry = WindowRegistry::new();
        let hits = Rc::new(RefCell::new(0));
        let sub = {
            let hits = hits.clone();
            registry.register_on_close(
                WindowName::Setting,
                Box::new(move |_, _| *hits.borrow_mut() += 1),
            )
        };
        registry.notify_closed(WindowName::Main, 1);
        assert_eq!(*hits.borrow(), 0);
        assert!(registry.unregister_id(sub.id()));
        registry.notify_closed(WindowName::Setting, 2);
        assert_eq!(*hits.borrow(), 0);
    }
}
