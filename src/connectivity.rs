use std::cell::Cell;
use std::rc::Rc;

/// Decides whether operations go to the store or to the offline buffer.
pub trait ConnectivityProbe {
    fn is_connected(&self) -> bool;

    /// A handle that lets the user flip the link, if the probe has one.
    fn switch(&self) -> Option<ManualLink> {
        None
    }
}

/// The store is local, so by default it is always reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_connected(&self) -> bool {
        true
    }
}

/// A link state toggled by hand. Clones share the same flag; the UI keeps one
/// and the controller polls another.
#[derive(Debug, Clone)]
pub struct ManualLink {
    online: Rc<Cell<bool>>,
}

impl ManualLink {
    pub fn new(online: bool) -> Self {
        ManualLink {
            online: Rc::new(Cell::new(online)),
        }
    }

    #[cfg(test)]
    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }

    /// Returns the new state.
    pub fn toggle(&self) -> bool {
        let online = !self.online.get();
        self.online.set(online);
        online
    }
}

impl ConnectivityProbe for ManualLink {
    fn is_connected(&self) -> bool {
        self.online.get()
    }

    fn switch(&self) -> Option<ManualLink> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_link_state() {
        let link = ManualLink::new(true);
        let probe: Box<dyn ConnectivityProbe> = Box::new(link.clone());
        assert!(probe.is_connected());
        assert!(!link.toggle());
        assert!(!probe.is_connected());
        probe.switch().unwrap().set_online(true);
        assert!(link.is_connected());
    }

    #[test]
    fn always_online_has_no_switch() {
        assert!(AlwaysOnline.is_connected());
        assert!(AlwaysOnline.switch().is_none());
    }
}
