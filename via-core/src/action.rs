//! Named server-side callables triggered by client events (spec.md §3
//! "Action", §4.4 action creation rules).

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;

/// The callable payload of an action. Always takes the executing `Context`,
/// resolving the open question in spec.md §9 note 4 ("the spec mandates
/// they do").
pub type ActionFn = Arc<dyn Fn(&Context) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct Action {
    id: String,
    callable: ActionFn,
}

impl Action {
    pub fn new(id: impl Into<String>, callable: ActionFn) -> Self {
        Self {
            id: id.into(),
            callable,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn call(&self, ctx: &Context) -> Result<()> {
        (self.callable)(ctx)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("id", &self.id).finish()
    }
}
