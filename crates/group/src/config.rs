use serde::Deserialize;

use crate::{GroupError, Result};

/// Largest handle value the cross-language binding layer can represent.
pub const HANDLE_MAX: usize = i32::MAX as usize;

/// Largest number of handle slots reserved up front. Beyond it the table grows on demand.
pub const INITIAL_HANDLES_MAX: usize = 1 << 16;

/// Group subsystem settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupConfig {
	/// Slots reserved in the handle table at init.
	pub initial_handles: usize,
	/// Hard bound on live handles.
	pub max_handles: usize,
	/// Maintain the shared failed-participants group.
	pub fault_tolerant: bool,
}

impl Default for GroupConfig {
	fn default() -> Self {
		Self {
			initial_handles: 4,
			max_handles: HANDLE_MAX,
			fault_tolerant: false,
		}
	}
}

impl GroupConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml(src: &str) -> Result<Self> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.max_handles == 0 || self.max_handles > HANDLE_MAX {
			return Err(GroupError::InvalidArgument(format!(
				"max_handles must be in 1..={HANDLE_MAX}, got {}",
				self.max_handles
			)));
		}
		let required = self.reserved_handles();
		if self.max_handles < required {
			return Err(GroupError::InvalidArgument(format!(
				"max_handles ({}) cannot hold the {required} built-in groups",
				self.max_handles
			)));
		}
		if self.initial_handles > INITIAL_HANDLES_MAX {
			return Err(GroupError::InvalidArgument(format!(
				"initial_handles ({}) exceeds {INITIAL_HANDLES_MAX}",
				self.initial_handles
			)));
		}
		if self.initial_handles > self.max_handles {
			return Err(GroupError::InvalidArgument(format!(
				"initial_handles ({}) exceeds max_handles ({})",
				self.initial_handles, self.max_handles
			)));
		}
		Ok(())
	}

	/// Handles taken at init: `NULL`, `EMPTY` and the failed alias when enabled.
	pub fn reserved_handles(&self) -> usize {
		2 + usize::from(self.fault_tolerant)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_uses_defaults() {
		assert_eq!(GroupConfig::from_toml("").unwrap(), GroupConfig::default());
	}

	#[test]
	fn partial_document_overrides_fields() {
		let config = GroupConfig::from_toml("max_handles = 64\nfault_tolerant = true\n").unwrap();
		assert_eq!(
			config,
			GroupConfig {
				initial_handles: 4,
				max_handles: 64,
				fault_tolerant: true,
			}
		);
	}

	#[test]
	fn rejects_unknown_keys() {
		assert!(matches!(
			GroupConfig::from_toml("handles = 3"),
			Err(GroupError::Config(_))
		));
	}

	#[test]
	fn rejects_inconsistent_bounds() {
		assert!(matches!(
			GroupConfig::from_toml("initial_handles = 10\nmax_handles = 2"),
			Err(GroupError::InvalidArgument(_))
		));
		assert!(matches!(
			GroupConfig::from_toml("max_handles = 0"),
			Err(GroupError::InvalidArgument(_))
		));
		assert!(matches!(
			GroupConfig::from_toml("initial_handles = 1\nmax_handles = 1"),
			Err(GroupError::InvalidArgument(_))
		));
		assert!(matches!(
			GroupConfig::from_toml("initial_handles = 2\nmax_handles = 2\nfault_tolerant = true"),
			Err(GroupError::InvalidArgument(_))
		));
		assert!(GroupConfig::from_toml("initial_handles = 2\nmax_handles = 2").is_ok());
	}

	#[test]
	fn rejects_oversized_preallocation() {
		assert!(matches!(
			GroupConfig::from_toml("initial_handles = 2147483647"),
			Err(GroupError::InvalidArgument(_))
		));
		let config = GroupConfig {
			initial_handles: INITIAL_HANDLES_MAX,
			..GroupConfig::default()
		};
		assert!(config.validate().is_ok());
	}
}
