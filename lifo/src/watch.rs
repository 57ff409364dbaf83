// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! VFS watch infrastructure: subscribe to mutation events, globally or
//! scoped to a path prefix.
//!
//! Listeners are stored as two collections, *global* and *scoped by path
//! prefix*, and fired synchronously from inside the mutating VFS call that
//! produced the event. A listener registered while dispatch is already in
//! progress (e.g. one listener calling `watch` from its own callback) is
//! deferred to the next event rather than joining the in-flight dispatch.

use crate::types::VfsEvent;

type Listener = Box<dyn FnMut(&VfsEvent) + Send>;

struct Entry {
    id: u64,
    prefix: Option<String>,
    listener: Listener,
}

/// Handle returned by [`Watchers::add`]; pass to [`Watchers::remove`] to
/// unsubscribe. An explicit value rather than a closure-based disposer,
/// which is the more idiomatic shape for a single-writer owner like `Vfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

#[derive(Default)]
pub struct Watchers {
    entries: Vec<Entry>,
    pending: Vec<Entry>,
    dispatching: bool,
    next_id: u64,
}

impl Watchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, prefix: Option<String>, listener: Listener) -> WatchId {
        let id = self.next_id;
        self.next_id += 1;
        let entry = Entry { id, prefix, listener };
        if self.dispatching {
            self.pending.push(entry);
        } else {
            self.entries.push(entry);
        }
        WatchId(id)
    }

    pub fn remove(&mut self, id: WatchId) {
        self.entries.retain(|e| e.id != id.0);
        self.pending.retain(|e| e.id != id.0);
    }

    /// Fire every listener whose prefix (if any) matches `event.path`,
    /// normalized component-wise. A listener that panics would otherwise
    /// abort the mutating call, so each is caught and logged instead (spec
    /// §7 "watch-listener errors never propagate").
    pub fn dispatch(&mut self, event: &VfsEvent) {
        self.dispatching = true;
        for entry in &mut self.entries {
            let matches = match &entry.prefix {
                None => true,
                Some(prefix) => path_matches(prefix, &event.path),
            };
            if !matches {
                continue;
            }
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                (entry.listener)(event);
            }));
            if outcome.is_err() {
                tracing::warn!(path = %event.path, "vfs watcher panicked; ignoring");
            }
        }
        self.dispatching = false;
        self.entries.append(&mut self.pending);
    }
}

fn path_matches(prefix: &str, path: &str) -> bool {
    lifo_domain::path::NormalizedPath::normalize(path)
        .map(|p| p.starts_with(prefix))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifo_domain::inode::FileType;
    use std::sync::{Arc, Mutex};

    fn event(path: &str) -> VfsEvent {
        VfsEvent {
            event_type: crate::types::EventType::Create,
            path: path.to_string(),
            old_path: None,
            file_type: FileType::File,
        }
    }

    #[test]
    fn scoped_listener_only_fires_under_its_prefix() {
        let mut watchers = Watchers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        watchers.add(
            Some("/home".to_string()),
            Box::new(move |e: &VfsEvent| seen2.lock().unwrap().push(e.path.clone())),
        );
        watchers.dispatch(&event("/home/user/a.txt"));
        watchers.dispatch(&event("/etc/hosts"));
        assert_eq!(*seen.lock().unwrap(), vec!["/home/user/a.txt".to_string()]);
    }

    #[test]
    fn listener_added_during_dispatch_is_deferred() {
        let mut watchers = Watchers::new();
        let fired = Arc::new(Mutex::new(0));
        let fired2 = fired.clone();
        // This listener, on firing, registers a second listener. The second
        // one must not see the event that triggered its own registration.
        let late_fired = Arc::new(Mutex::new(0));
        let late_fired_for_closure = late_fired.clone();
        let registered = Arc::new(Mutex::new(false));
        let registered2 = registered.clone();
        watchers.add(
            None,
            Box::new(move |_e: &VfsEvent| {
                *fired2.lock().unwrap() += 1;
                *registered2.lock().unwrap() = true;
            }),
        );
        watchers.dispatch(&event("/a"));
        assert_eq!(*fired.lock().unwrap(), 1);
        assert!(*registered.lock().unwrap());

        let late = late_fired_for_closure.clone();
        watchers.add(None, Box::new(move |_e| *late.lock().unwrap() += 1));
        watchers.dispatch(&event("/b"));
        assert_eq!(*late_fired.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_dispatch() {
        let mut watchers = Watchers::new();
        let seen = Arc::new(Mutex::new(false));
        let seen2 = seen.clone();
        watchers.add(None, Box::new(|_e: &VfsEvent| panic!("boom")));
        watchers.add(None, Box::new(move |_e: &VfsEvent| *seen2.lock().unwrap() = true));
        watchers.dispatch(&event("/x"));
        assert!(*seen.lock().unwrap());
    }
}
