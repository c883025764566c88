#![forbid(unsafe_code)]

//! Container definitions.
//!
//! A [`Container`] is the reusable, immutable description of a paged
//! surface: its [`ContainerConfig`] plus the [`ContainerProvider`] that fills
//! it. Opening a container for a viewer creates a separate
//! [`ContainerLifecycle`](crate::ContainerLifecycle); the definition itself
//! never changes.
//!
//! Copies are explicit. [`Container::snapshot`] produces a
//! [`ContainerSnapshot`] value, which can be edited through
//! [`ContainerSnapshot::into_builder`] and turned back into a container.
//! With [`ContainerOptions::KEEP_ORIGINAL`] the first definition built is
//! remembered by every copy made from it, and
//! [`Container::restore_original`] returns it.
//!
//! ```
//! use slotpage_runtime::{Container, ContainerConfig, ContainerOptions, Contents, ViewerId};
//!
//! let shop = Container::<String>::builder()
//!     .config(ContainerConfig::default().with_title("Shop").with_options(ContainerOptions::KEEP_ORIGINAL))
//!     .provider(|_viewer: ViewerId, contents: &mut Contents<String>| {
//!         contents.extend_items((0..40).map(|n| format!("item {n}")));
//!     })
//!     .build()?;
//!
//! let sale = shop.snapshot().into_builder().title("Sale").build()?;
//! assert_eq!(sale.config().title, "Sale");
//! assert_eq!(sale.restore_original()?.config().title, "Shop");
//! # Ok::<(), slotpage_runtime::LifecycleError>(())
//! ```

use std::fmt;
use std::rc::Rc;

use crate::config::{ContainerConfig, ContainerOptions};
use crate::contents::Contents;
use crate::error::LifecycleError;
use crate::surface::ViewerId;

/// Fills and updates a container's contents.
///
/// Only [`init`](Self::init) is required. Hooks take `&self`; providers that
/// keep state between calls use interior mutability.
pub trait ContainerProvider<V> {
    /// Populate the contents when the container opens.
    fn init(&self, viewer: ViewerId, contents: &mut Contents<V>);

    /// Periodic update, every `update_period` ticks while open.
    fn update(&self, _viewer: ViewerId, _contents: &mut Contents<V>) {}

    /// The viewer moved from page `from` to page `to`.
    fn page_changed(&self, _viewer: ViewerId, _from: u32, _to: u32, _contents: &mut Contents<V>) {}

    /// The container is closing.
    fn closed(&self, _viewer: ViewerId, _contents: &Contents<V>) {}
}

impl<V, F> ContainerProvider<V> for F
where
    F: Fn(ViewerId, &mut Contents<V>),
{
    fn init(&self, viewer: ViewerId, contents: &mut Contents<V>) {
        self(viewer, contents);
    }
}

/// Provider that leaves the contents empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProvider;

impl<V> ContainerProvider<V> for EmptyProvider {
    fn init(&self, _viewer: ViewerId, _contents: &mut Contents<V>) {}
}

struct Definition<V> {
    config: ContainerConfig,
    provider: Rc<dyn ContainerProvider<V>>,
    original: Option<Rc<Definition<V>>>,
}

/// A reusable container definition.
pub struct Container<V> {
    def: Rc<Definition<V>>,
}

impl<V> Clone for Container<V> {
    fn clone(&self) -> Self {
        Self {
            def: Rc::clone(&self.def),
        }
    }
}

impl<V: 'static> Container<V> {
    /// Start building a container.
    pub fn builder() -> ContainerBuilder<V> {
        ContainerBuilder::default()
    }
}

impl<V> Container<V> {
    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.def.config
    }

    pub(crate) fn provider(&self) -> &dyn ContainerProvider<V> {
        self.def.provider.as_ref()
    }

    /// Whether `other` is this definition or a clone of it.
    ///
    /// Copies made with [`new_instance`](Self::new_instance) or through a
    /// snapshot are distinct definitions.
    pub fn same_definition(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def)
    }

    /// Value copy of the definition.
    pub fn snapshot(&self) -> ContainerSnapshot<V> {
        ContainerSnapshot {
            config: self.def.config.clone(),
            provider: Rc::clone(&self.def.provider),
            original: self.def.original.clone(),
        }
    }

    /// An equal but distinct definition.
    pub fn new_instance(&self) -> Self {
        Self::from(self.snapshot())
    }

    /// Whether an original definition was kept.
    pub fn keeps_original(&self) -> bool {
        self.def.original.is_some()
    }

    /// The first definition this one was copied from.
    pub fn restore_original(&self) -> Result<Self, LifecycleError> {
        let original = self
            .def
            .original
            .as_ref()
            .ok_or(LifecycleError::NoOriginalKept)?;
        Ok(Self {
            def: Rc::new(Definition {
                config: original.config.clone(),
                provider: Rc::clone(&original.provider),
                original: Some(Rc::clone(original)),
            }),
        })
    }
}

impl<V> fmt::Debug for Container<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.def.config)
            .field("keeps_original", &self.keeps_original())
            .finish_non_exhaustive()
    }
}

/// A detached copy of a container definition.
pub struct ContainerSnapshot<V> {
    config: ContainerConfig,
    provider: Rc<dyn ContainerProvider<V>>,
    original: Option<Rc<Definition<V>>>,
}

impl<V> Clone for ContainerSnapshot<V> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            provider: Rc::clone(&self.provider),
            original: self.original.clone(),
        }
    }
}

impl<V> ContainerSnapshot<V> {
    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Builder pre-filled from this snapshot.
    pub fn into_builder(self) -> ContainerBuilder<V> {
        ContainerBuilder {
            config: self.config,
            provider: Some(self.provider),
            original: self.original,
        }
    }
}

impl<V> From<ContainerSnapshot<V>> for Container<V> {
    fn from(snapshot: ContainerSnapshot<V>) -> Self {
        Self {
            def: Rc::new(Definition {
                config: snapshot.config,
                provider: snapshot.provider,
                original: snapshot.original,
            }),
        }
    }
}

impl<V> fmt::Debug for ContainerSnapshot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerSnapshot")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Container`].
pub struct ContainerBuilder<V> {
    config: ContainerConfig,
    provider: Option<Rc<dyn ContainerProvider<V>>>,
    original: Option<Rc<Definition<V>>>,
}

impl<V> Default for ContainerBuilder<V> {
    fn default() -> Self {
        Self {
            config: ContainerConfig::default(),
            provider: None,
            original: None,
        }
    }
}

impl<V: 'static> ContainerBuilder<V> {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Edit the configuration in place.
    #[must_use]
    pub fn configure(mut self, f: impl FnOnce(ContainerConfig) -> ContainerConfig) -> Self {
        self.config = f(self.config);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: usize) -> Self {
        self.config = self.config.with_rows(rows);
        self
    }

    #[must_use]
    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.config.options = options;
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl ContainerProvider<V> + 'static) -> Self {
        self.provider = Some(Rc::new(provider));
        self
    }

    /// Share a provider with other containers.
    #[must_use]
    pub fn shared_provider(mut self, provider: Rc<dyn ContainerProvider<V>>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validate the configuration and build.
    ///
    /// Without a provider the container opens empty.
    pub fn build(self) -> Result<Container<V>, LifecycleError> {
        self.config.validate()?;
        let provider = self
            .provider
            .unwrap_or_else(|| Rc::new(EmptyProvider) as Rc<dyn ContainerProvider<V>>);
        let keep = self.config.keeps_original();
        let mut def = Definition {
            config: self.config,
            provider,
            original: self.original.filter(|_| keep),
        };
        if keep && def.original.is_none() {
            def.original = Some(Rc::new(Definition {
                config: def.config.clone(),
                provider: Rc::clone(&def.provider),
                original: None,
            }));
        }
        Ok(Container { def: Rc::new(def) })
    }
}

impl<V> fmt::Debug for ContainerBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("config", &self.config)
            .field("has_provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}
