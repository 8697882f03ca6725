//! Process-wide lifecycle for the runtime instance.
//!
//! Subsystems initialize in dependency order and append a finalize callback to the
//! [`Instance`]. [`Instance::finalize`] runs each callback exactly once, last registered
//! first, so a subsystem is torn down before anything it was built on.

use parking_lot::Mutex;

/// Error reported by a finalize callback.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
	#[error("instance already finalized")]
	Finalized,
	#[error("finalize callback `{name}` failed: {message}")]
	Callback { name: &'static str, message: String },
}

type FinalizeFn = Box<dyn FnOnce() -> Result<(), String> + Send>;

struct Callback {
	name: &'static str,
	run: FinalizeFn,
}

#[derive(Default)]
struct State {
	callbacks: Vec<Callback>,
	finalized: bool,
}

/// Owner of the shutdown sequence.
#[derive(Default)]
pub struct Instance {
	state: Mutex<State>,
}

impl Instance {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a callback to the shutdown sequence.
	///
	/// Fails once the instance has been finalized.
	pub fn append_finalize<F>(&self, name: &'static str, f: F) -> Result<(), InstanceError>
	where
		F: FnOnce() -> Result<(), String> + Send + 'static,
	{
		let mut state = self.state.lock();
		if state.finalized {
			return Err(InstanceError::Finalized);
		}
		state.callbacks.push(Callback {
			name,
			run: Box::new(f),
		});
		Ok(())
	}

	/// Number of callbacks waiting to run.
	pub fn pending(&self) -> usize {
		self.state.lock().callbacks.len()
	}

	pub fn is_finalized(&self) -> bool {
		self.state.lock().finalized
	}

	/// Runs every registered callback in reverse registration order.
	///
	/// Subsystems are torn down opposite to the order they were brought up, matching the
	/// cleanup order the message-passing runtime uses for its own components.
	///
	/// All callbacks run even if one fails; the first failure is returned.
	pub fn finalize(&self) -> Result<(), InstanceError> {
		let callbacks = {
			let mut state = self.state.lock();
			if state.finalized {
				return Err(InstanceError::Finalized);
			}
			state.finalized = true;
			std::mem::take(&mut state.callbacks)
		};

		tracing::debug!(count = callbacks.len(), "finalizing instance");
		let mut first_err = None;
		for cb in callbacks.into_iter().rev() {
			if let Err(message) = (cb.run)() {
				tracing::warn!(callback = cb.name, %message, "finalize callback failed");
				first_err.get_or_insert(InstanceError::Callback {
					name: cb.name,
					message,
				});
			}
		}
		first_err.map_or(Ok(()), Err)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[test]
	fn callbacks_run_last_registered_first() {
		let order = Arc::new(Mutex::new(Vec::new()));
		let instance = Instance::new();
		for name in ["proc", "group", "comm"] {
			let order = order.clone();
			instance
				.append_finalize(name, move || {
					order.lock().push(name);
					Ok(())
				})
				.unwrap();
		}
		assert_eq!(instance.pending(), 3);

		instance.finalize().unwrap();
		assert_eq!(*order.lock(), vec!["comm", "group", "proc"]);
		assert_eq!(instance.pending(), 0);
	}

	#[test]
	fn failing_callback_does_not_stop_the_rest() {
		let ran = Arc::new(Mutex::new(0));
		let instance = Instance::new();
		let counter = ran.clone();
		instance
			.append_finalize("first", move || {
				*counter.lock() += 1;
				Ok(())
			})
			.unwrap();
		instance
			.append_finalize("broken", || Err("boom".into()))
			.unwrap();

		let err = instance.finalize().unwrap_err();
		assert!(matches!(err, InstanceError::Callback { name: "broken", .. }));
		assert_eq!(*ran.lock(), 1);
	}

	#[test]
	fn second_finalize_is_rejected() {
		let instance = Instance::new();
		instance.finalize().unwrap();
		assert!(instance.is_finalized());
		assert!(matches!(instance.finalize(), Err(InstanceError::Finalized)));
		assert!(matches!(
			instance.append_finalize("late", || Ok(())),
			Err(InstanceError::Finalized)
		));
	}
}
