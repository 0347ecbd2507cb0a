use std::io;

use markup5ever_rcdom::{Handle, RcDom};

use crate::dom;
use crate::error::ScriptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    pub fn is_enter(&self) -> bool {
        self.key == Key::Enter
    }
}

/// Something installed on a page that reacts to its lifecycle events.
/// Each call runs to completion synchronously; nothing is held across calls
/// except what the behavior resolved during `on_load`.
pub trait Behavior {
    fn name(&self) -> &'static str;

    fn on_load(&self, page: &Page) -> Result<(), ScriptError>;

    fn on_keydown(&self, _page: &Page, _event: &KeyEvent) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// A handler that aborted while the rest of the page kept going.
#[derive(Debug)]
pub struct HandlerFault {
    pub behavior: &'static str,
    pub error: ScriptError,
}

/// A parsed html document plus the behaviors installed on it.
pub struct Page {
    dom: RcDom,
    behaviors: Vec<Box<dyn Behavior>>,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            dom: dom::get_dom(html),
            behaviors: Vec::new(),
        }
    }

    pub fn install(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.push(behavior);
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn element_by_id(&self, id: &str) -> Option<Handle> {
        dom::element_by_id(&self.dom.document, id)
    }

    /// Fires the page-ready event. Faults are logged and returned; a failing
    /// behavior never stops the others.
    pub fn fire_load(&self) -> Vec<HandlerFault> {
        self.dispatch(|behavior| behavior.on_load(self))
    }

    pub fn fire_keydown(&self, event: &KeyEvent) -> Vec<HandlerFault> {
        self.dispatch(|behavior| behavior.on_keydown(self, event))
    }

    fn dispatch<F>(&self, mut handler: F) -> Vec<HandlerFault>
    where
        F: FnMut(&dyn Behavior) -> Result<(), ScriptError>,
    {
        let mut faults = Vec::new();
        for behavior in self.behaviors.iter() {
            if let Err(error) = handler(behavior.as_ref()) {
                log::error!("{} handler aborted: {:#}", behavior.name(), error);
                faults.push(HandlerFault {
                    behavior: behavior.name(),
                    error,
                });
            }
        }
        faults
    }

    pub fn html(&self) -> io::Result<String> {
        dom::serialize_document(&self.dom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        loads: Rc<Cell<usize>>,
        keys: Rc<Cell<usize>>,
    }

    impl Behavior for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn on_load(&self, _page: &Page) -> Result<(), ScriptError> {
            self.loads.set(self.loads.get() + 1);
            Ok(())
        }

        fn on_keydown(&self, _page: &Page, event: &KeyEvent) -> Result<(), ScriptError> {
            if event.is_enter() {
                self.keys.set(self.keys.get() + 1);
            }
            Ok(())
        }
    }

    struct Broken;

    impl Behavior for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn on_load(&self, _page: &Page) -> Result<(), ScriptError> {
            Err(ScriptError::MissingElement("#gone".to_string()))
        }
    }

    #[test]
    fn test_fault_is_local_to_its_handler() {
        let loads = Rc::new(Cell::new(0));
        let keys = Rc::new(Cell::new(0));
        let mut page = Page::parse("<html><body></body></html>");
        page.install(Box::new(Broken));
        page.install(Box::new(Counter {
            loads: loads.clone(),
            keys: keys.clone(),
        }));

        let faults = page.fire_load();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].behavior, "broken");
        assert_eq!(loads.get(), 1);

        assert!(page.fire_keydown(&KeyEvent::new(Key::Char('a'))).is_empty());
        assert!(page.fire_keydown(&KeyEvent::new(Key::Enter)).is_empty());
        assert_eq!(keys.get(), 1);
    }
}
