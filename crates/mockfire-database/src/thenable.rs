use std::future::{ready, IntoFuture, Ready};
use std::ops::Deref;

use crate::error::DatabaseResult;
use crate::reference::Reference;

/// The result of `push`: a reference to the new child that can also be
/// awaited for the outcome of the write.
///
/// Dereferences to the new child's [`Reference`], so it can be used as one
/// before (or without) awaiting.
#[derive(Debug)]
pub struct ThenableReference {
    reference: Reference,
    outcome: DatabaseResult<()>,
}

impl ThenableReference {
    pub(crate) fn new(reference: Reference, outcome: DatabaseResult<()>) -> Self {
        Self { reference, outcome }
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }
}

impl Deref for ThenableReference {
    type Target = Reference;

    fn deref(&self) -> &Reference {
        &self.reference
    }
}

impl IntoFuture for ThenableReference {
    type Output = DatabaseResult<Reference>;
    type IntoFuture = Ready<DatabaseResult<Reference>>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.outcome.map(|()| self.reference))
    }
}
