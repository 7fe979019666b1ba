//! Warning delivery.
//!
//! Warnings never abort a call. Each wrapper owns a [`WarningSink`] that
//! logs them and then hands them to a registered handler or keeps them
//! until they are taken or the next error on that wrapper carries them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::WarningPolicy;
use crate::error::{Error, Result};
use crate::exception::MagickException;

/// Callback receiving native warnings.
pub type WarningHandler = dyn Fn(&MagickException) + Send + Sync;

pub struct WarningSink {
    policy: WarningPolicy,
    handler: Mutex<Option<Arc<WarningHandler>>>,
    collected: Mutex<Vec<MagickException>>,
}

impl WarningSink {
    pub fn new(policy: WarningPolicy) -> Self {
        Self {
            policy,
            handler: Mutex::new(None),
            collected: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> WarningPolicy {
        self.policy
    }

    /// Register the handler used under [`WarningPolicy::Notify`].
    pub fn on_warning(&self, handler: impl Fn(&MagickException) + Send + Sync + 'static) {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    /// New empty sink with the same policy and handler.
    pub fn fork(&self) -> Self {
        Self {
            policy: self.policy,
            handler: Mutex::new(self.handler.lock().clone()),
            collected: Mutex::new(Vec::new()),
        }
    }

    /// Route the outcome of one checked native call.
    ///
    /// Warnings are delivered or collected one by one in emission order and
    /// the call succeeds. An error gets the collected warnings prepended to
    /// its related exceptions.
    pub fn handle(&self, outcome: Result<Option<MagickException>>) -> Result<()> {
        match outcome {
            Ok(None) => Ok(()),
            Ok(Some(warning)) => {
                for warning in warning.flatten() {
                    self.deliver(warning);
                }
                Ok(())
            }
            Err(Error::Magick(mut exception)) => {
                let mut related = std::mem::take(&mut *self.collected.lock());
                if !related.is_empty() {
                    related.append(&mut exception.related);
                    exception.related = related;
                }
                Err(Error::Magick(exception))
            }
            Err(e) => Err(e),
        }
    }

    /// Drain the collected warnings, oldest first.
    pub fn take_warnings(&self) -> Vec<MagickException> {
        std::mem::take(&mut *self.collected.lock())
    }

    /// Move warnings collected by `other` to the end of this sink.
    pub fn absorb(&self, other: &WarningSink) {
        let mut moved = other.take_warnings();
        self.collected.lock().append(&mut moved);
    }

    pub fn has_warnings(&self) -> bool {
        !self.collected.lock().is_empty()
    }

    fn deliver(&self, warning: MagickException) {
        tracing::warn!(
            target: crate::logging::TARGET,
            severity = %warning.severity,
            "{}",
            warning.message
        );
        let handler = match self.policy {
            WarningPolicy::Notify => self.handler.lock().clone(),
            WarningPolicy::Collect => None,
        };
        match handler {
            Some(handler) => handler(&warning),
            None => self.collected.lock().push(warning),
        }
    }
}

impl Default for WarningSink {
    fn default() -> Self {
        Self::new(WarningPolicy::default())
    }
}

impl fmt::Debug for WarningSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarningSink")
            .field("policy", &self.policy)
            .field("handler", &self.handler.lock().is_some())
            .field("collected", &self.collected.lock().len())
            .finish()
    }
}
