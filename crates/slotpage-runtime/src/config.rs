#![forbid(unsafe_code)]

//! Container configuration.
//!
//! [`ContainerConfig`] is a plain value with public fields and builder-style
//! `with_*` helpers. It is checked once, by
//! [`ContainerBuilder::build`](crate::ContainerBuilder::build); nothing at
//! tick time re-validates it.
//!
//! # Defaults
//!
//! | Field | Default |
//! |---|---|
//! | `width` | 9 |
//! | `rows` | 3 |
//! | `size` | unset (derived from `rows`) |
//! | `items_per_page` | unset (surface size) |
//! | `update_period` | 1 tick |
//! | `restore_delay` | 2 ticks |
//! | `auto_close` | unset |
//! | `options` | `TRANSFER_DATA` |

use bitflags::bitflags;
use slotpage_core::geometry::GridSize;
use slotpage_layout::PlacementConstraint;

use crate::error::LifecycleError;

bitflags! {
    /// Behaviour switches for a container.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ContainerOptions: u8 {
        /// Carry sticky items and properties across page changes.
        const TRANSFER_DATA  = 0b001;
        /// Keep an untouched copy of the definition for `restore_original`.
        const KEEP_ORIGINAL  = 0b010;
        /// Empty the viewer's personal cells while open; restore them on close.
        const CLEAR_AND_SAVE = 0b100;
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self::TRANSFER_DATA
    }
}

/// How a container looks and behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerConfig {
    /// Cells per row.
    pub width: usize,
    /// Rows, used when `size` is unset.
    pub rows: usize,
    /// Explicit cell count; must be a positive multiple of `width`.
    pub size: Option<usize>,
    /// Paginated items per page; defaults to the surface size.
    pub items_per_page: Option<usize>,
    /// Automatic placement parameters.
    pub constraint: PlacementConstraint,
    /// Initial title.
    pub title: String,
    /// Close automatically after this many ticks.
    pub auto_close: Option<u64>,
    /// Ticks between provider updates.
    pub update_period: u64,
    /// Ticks between close and restoring the viewer's personal cells.
    pub restore_delay: u64,
    /// Behaviour switches.
    pub options: ContainerOptions,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            width: 9,
            rows: 3,
            size: None,
            items_per_page: None,
            constraint: PlacementConstraint::default(),
            title: String::new(),
            auto_close: None,
            update_period: 1,
            restore_delay: 2,
            options: ContainerOptions::default(),
        }
    }
}

impl ContainerConfig {
    /// Set the number of rows.
    #[must_use]
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self.size = None;
        self
    }

    /// Set the row width.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set an explicit cell count instead of a row count.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_items_per_page(mut self, items_per_page: usize) -> Self {
        self.items_per_page = Some(items_per_page);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: PlacementConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Close automatically `ticks` ticks after opening.
    #[must_use]
    pub fn with_auto_close(mut self, ticks: u64) -> Self {
        self.auto_close = Some(ticks);
        self
    }

    #[must_use]
    pub fn with_update_period(mut self, ticks: u64) -> Self {
        self.update_period = ticks;
        self
    }

    #[must_use]
    pub fn with_restore_delay(mut self, ticks: u64) -> Self {
        self.restore_delay = ticks;
        self
    }

    /// Turn options on.
    #[must_use]
    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options |= options;
        self
    }

    /// Turn options off.
    #[must_use]
    pub fn without_options(mut self, options: ContainerOptions) -> Self {
        self.options &= !options;
        self
    }

    /// Surface dimensions.
    pub fn grid(&self) -> GridSize {
        match self.size {
            Some(size) if self.width > 0 => GridSize::new(self.width, size / self.width),
            _ => GridSize::new(self.width, self.rows),
        }
    }

    /// Items per page after defaults.
    pub fn effective_items_per_page(&self) -> usize {
        self.items_per_page
            .unwrap_or_else(|| self.grid().capacity())
    }

    #[inline]
    pub fn transfers_data(&self) -> bool {
        self.options.contains(ContainerOptions::TRANSFER_DATA)
    }

    #[inline]
    pub fn keeps_original(&self) -> bool {
        self.options.contains(ContainerOptions::KEEP_ORIGINAL)
    }

    #[inline]
    pub fn clears_and_saves(&self) -> bool {
        self.options.contains(ContainerOptions::CLEAR_AND_SAVE)
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.width == 0 {
            return Err(LifecycleError::InvalidConfig {
                reason: "width must be positive",
            });
        }
        match self.size {
            Some(0) => {
                return Err(LifecycleError::InvalidConfig {
                    reason: "size must be positive",
                });
            }
            Some(size) if size % self.width != 0 => {
                return Err(LifecycleError::InvalidConfig {
                    reason: "size must be a multiple of width",
                });
            }
            None if self.rows == 0 => {
                return Err(LifecycleError::InvalidConfig {
                    reason: "rows must be positive",
                });
            }
            _ => {}
        }
        if self.update_period == 0 {
            return Err(LifecycleError::InvalidConfig {
                reason: "update period must be at least one tick",
            });
        }
        if self.items_per_page == Some(0) {
            return Err(slotpage_layout::PlacementError::ZeroItemsPerPage.into());
        }
        self.constraint.validate_for(self.grid())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotpage_layout::PlacementError;

    #[test]
    fn defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.grid(), GridSize::new(9, 3));
        assert_eq!(config.effective_items_per_page(), 27);
        assert!(config.transfers_data());
        assert!(!config.keeps_original());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn size_overrides_rows() {
        let config = ContainerConfig::default().with_rows(6).with_size(18);
        assert_eq!(config.grid(), GridSize::new(9, 2));
        let config = config.with_rows(4);
        assert_eq!(config.grid(), GridSize::new(9, 4));
    }

    #[test]
    fn options_toggle() {
        let config = ContainerConfig::default()
            .with_options(ContainerOptions::KEEP_ORIGINAL | ContainerOptions::CLEAR_AND_SAVE)
            .without_options(ContainerOptions::TRANSFER_DATA);
        assert!(config.keeps_original());
        assert!(config.clears_and_saves());
        assert!(!config.transfers_data());
    }

    #[test]
    fn rejects_bad_shapes() {
        let bad = [
            ContainerConfig::default().with_width(0),
            ContainerConfig::default().with_size(10),
            ContainerConfig::default().with_size(0),
            ContainerConfig::default().with_rows(0),
            ContainerConfig::default().with_update_period(0),
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(LifecycleError::InvalidConfig { .. })
            ));
        }
        assert_eq!(
            ContainerConfig::default().with_items_per_page(0).validate(),
            Err(LifecycleError::Placement(PlacementError::ZeroItemsPerPage))
        );
    }

    #[test]
    fn constraint_is_checked_against_the_grid() {
        let constraint = PlacementConstraint::builder().end(40).build().unwrap();
        let config = ContainerConfig::default().with_constraint(constraint);
        assert_eq!(
            config.validate(),
            Err(LifecycleError::Placement(PlacementError::SlotOutOfBounds {
                cell: 40,
                capacity: 27
            }))
        );
    }
}
