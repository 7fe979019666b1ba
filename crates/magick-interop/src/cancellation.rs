//! Cooperative cancellation for multi-step operations.
//!
//! Operations that chain several native calls take an `impl Stop` from the
//! `enough` crate and check it between calls. A stop prevents further work
//! from starting; a native call already running always completes. Pass
//! [`Unstoppable`] when cancellation is not needed, or a
//! [`CancellationToken`] that another thread can cancel.

pub use almost_enough::Stopper as CancellationToken;
pub use enough::{Stop, StopReason, Unstoppable};

use crate::error::{Error, Result};

impl From<StopReason> for Error {
    fn from(reason: StopReason) -> Self {
        tracing::debug!(?reason, "operation stopped");
        Error::Cancelled
    }
}

/// `Err(Cancelled)` once `stop` asks for it.
pub(crate) fn check(stop: &(impl Stop + ?Sized)) -> Result<()> {
    stop.check()?;
    Ok(())
}
