#![forbid(unsafe_code)]

//! Content items.
//!
//! An [`Item`] is a cell value plus two optional per-viewer predicates. The
//! predicates are evaluated when the surface is rendered or clicked, never
//! during placement: an item hidden from one viewer still owns its cell.

use std::fmt;
use std::rc::Rc;

use crate::surface::ViewerId;

/// Per-viewer visibility or interactivity check.
pub type ViewerPredicate = Rc<dyn Fn(ViewerId) -> bool>;

/// A cell value that an [`Animator`](crate::Animator) can rename or annotate.
///
/// Both methods default to doing nothing, so plain values only need an empty
/// `impl`.
pub trait CellValue: Clone + 'static {
    /// Replace the display name.
    fn set_name(&mut self, _name: &str) {}

    /// Replace one line of descriptive text.
    fn set_lore_line(&mut self, _line: usize, _text: &str) {}
}

impl CellValue for String {
    fn set_name(&mut self, name: &str) {
        name.clone_into(self);
    }
}

/// A value placed on a surface cell.
#[derive(Clone)]
pub struct Item<V> {
    value: V,
    display: Option<ViewerPredicate>,
    interact: Option<ViewerPredicate>,
}

impl<V> Item<V> {
    /// Item visible to and clickable by everyone.
    pub fn new(value: V) -> Self {
        Self {
            value,
            display: None,
            interact: None,
        }
    }

    /// Show the item only to viewers for which `f` holds.
    #[must_use]
    pub fn with_display(mut self, f: impl Fn(ViewerId) -> bool + 'static) -> Self {
        self.display = Some(Rc::new(f));
        self
    }

    /// Accept clicks only from viewers for which `f` holds.
    #[must_use]
    pub fn with_interact(mut self, f: impl Fn(ViewerId) -> bool + 'static) -> Self {
        self.interact = Some(Rc::new(f));
        self
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Whether `viewer` sees this item.
    pub fn can_display(&self, viewer: ViewerId) -> bool {
        self.display.as_ref().is_none_or(|f| f(viewer))
    }

    /// Whether `viewer` may interact with this item.
    pub fn can_interact(&self, viewer: ViewerId) -> bool {
        self.interact.as_ref().is_none_or(|f| f(viewer))
    }
}

impl<V> From<V> for Item<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Item<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("value", &self.value)
            .field("display", &self.display.is_some())
            .field("interact", &self.interact.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_default_to_true() {
        let item = Item::new("stone");
        assert!(item.can_display(ViewerId(1)));
        assert!(item.can_interact(ViewerId(1)));
    }

    #[test]
    fn predicates_are_per_viewer() {
        let item = Item::new(1)
            .with_display(|v| v.0 % 2 == 0)
            .with_interact(|v| v.0 == 4);
        assert!(item.can_display(ViewerId(2)));
        assert!(!item.can_display(ViewerId(3)));
        assert!(!item.can_interact(ViewerId(2)));
        assert!(item.can_interact(ViewerId(4)));
    }

    #[test]
    fn string_values_take_names() {
        let mut value = String::from("old");
        value.set_name("new");
        assert_eq!(value, "new");
    }
}
