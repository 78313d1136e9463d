//! Exception-safe resource lifecycles for operation sequences.
//!
//! A [`ContextResource`] is the capability a sequence needs to manage a
//! resource across a block of steps: acquire it before the block, release it
//! afterwards on every path, with the propagating failure (if any) visible
//! to the release.

use crate::error::OpsError;
use std::cell::RefCell;
use std::rc::Rc;

/// Acquire/release protocol for a resource scoped to part of a sequence.
///
/// `release` receives the failure that is propagating past the scope, or
/// `None` when the scoped steps completed. A release must not suppress the
/// failure; the executor re-raises it after cleanup.
pub trait ContextResource {
    type Handle;

    fn acquire(&self) -> Result<Self::Handle, OpsError>;

    fn release(&self, handle: Self::Handle, failure: Option<&OpsError>) -> Result<(), OpsError>;
}

/// Object-safe runtime face of a context scope. Holds the live handle
/// between acquire and release; the handle is taken exactly once, so a
/// successful acquire is released at most once.
pub(crate) trait ScopeRuntime {
    fn acquire(&self) -> Result<(), OpsError>;
    fn release(&self, failure: Option<&OpsError>) -> Result<(), OpsError>;
}

pub(crate) struct ScopeCell<R: ContextResource> {
    resource: Rc<R>,
    handle: RefCell<Option<R::Handle>>,
}

impl<R: ContextResource> ScopeCell<R> {
    pub(crate) fn new(resource: Rc<R>) -> Self {
        Self {
            resource,
            handle: RefCell::new(None),
        }
    }
}

impl<R: ContextResource> ScopeRuntime for ScopeCell<R> {
    fn acquire(&self) -> Result<(), OpsError> {
        if self.handle.borrow().is_some() {
            return Err(OpsError::internal("context acquired while already held"));
        }
        let handle = self.resource.acquire()?;
        *self.handle.borrow_mut() = Some(handle);
        Ok(())
    }

    fn release(&self, failure: Option<&OpsError>) -> Result<(), OpsError> {
        match self.handle.borrow_mut().take() {
            Some(handle) => self.resource.release(handle, failure),
            None => Err(OpsError::internal("context released without a live acquire")),
        }
    }
}
