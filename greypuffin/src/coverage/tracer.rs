//! The per-thread step hook.
//!
//! Instrumented code reports steps through [`on_step`] (usually via [`step!`](crate::step)).
//! At most one hook is active per thread. A [`HookScope`] installs a hook for the duration of
//! one execution, chains to whichever hook was active before, and puts that hook back when
//! released or dropped.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::coverage::StepLocation;
use crate::error::Error;

pub trait StepHook {
    /// Observes one step. Must not panic and must not alter the control flow of the target.
    fn on_step(&self, step: &StepLocation);
}

thread_local! {
    static ACTIVE_HOOK: RefCell<Option<Rc<dyn StepHook>>> = RefCell::new(None);
}

/// Reports a step to the active hook, if any.
#[inline]
pub fn on_step(context: &'static str, position: u32) {
    let hook = ACTIVE_HOOK
        .try_with(|slot| slot.try_borrow().ok().and_then(|hook| hook.clone()))
        .ok()
        .flatten();

    if let Some(hook) = hook {
        let step = StepLocation::new(context, position);
        if cfg!(feature = "step_log") {
            trace!("step {}", step);
        }
        hook.on_step(&step);
    }
}

/// Whether a hook is installed on this thread
pub fn is_active() -> bool {
    ACTIVE_HOOK
        .try_with(|slot| slot.borrow().is_some())
        .unwrap_or(false)
}

fn replace_active(hook: Option<Rc<dyn StepHook>>) -> Option<Rc<dyn StepHook>> {
    ACTIVE_HOOK
        .try_with(|slot| slot.replace(hook))
        .ok()
        .flatten()
}

/// Forwards to the previously active hook first, then to the scoped hook.
struct Chained {
    previous: Option<Rc<dyn StepHook>>,
    hook: Rc<dyn StepHook>,
}

impl StepHook for Chained {
    fn on_step(&self, step: &StepLocation) {
        if let Some(previous) = &self.previous {
            previous.on_step(step);
        }
        self.hook.on_step(step);
    }
}

/// Installation of one hook, undone on [`HookScope::release`] or on drop.
#[must_use = "the hook is uninstalled when the scope is dropped"]
pub struct HookScope {
    previous: Option<Rc<dyn StepHook>>,
    installed: Rc<dyn StepHook>,
    released: bool,
}

impl HookScope {
    pub fn install(hook: Rc<dyn StepHook>) -> Self {
        let previous = ACTIVE_HOOK
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten();

        let installed: Rc<dyn StepHook> = Rc::new(Chained {
            previous: previous.clone(),
            hook,
        });
        replace_active(Some(installed.clone()));

        Self {
            previous,
            installed,
            released: false,
        }
    }

    /// Restores the previously active hook.
    ///
    /// Fails if the active hook is no longer the one this scope installed, for example because
    /// the target swapped hooks without restoring them. The previous hook is restored anyway.
    pub fn release(mut self) -> Result<(), Error> {
        self.released = true;
        let current = replace_active(self.previous.take());

        match current {
            Some(current) if Rc::ptr_eq(&current, &self.installed) => Ok(()),
            Some(_) => Err(Error::Engine(
                "a foreign step hook was active when releasing the hook scope".into(),
            )),
            None => Err(Error::Engine(
                "the step hook was uninstalled before the hook scope was released".into(),
            )),
        }
    }
}

impl Drop for HookScope {
    fn drop(&mut self) {
        if !self.released {
            replace_active(self.previous.take());
        }
    }
}
