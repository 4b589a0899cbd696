//! thunk-dispatch: Centralized state store with reactive actions
//!
//! Like Redux with easy-peasy's `thunkOn`: a reactive action names the action
//! types it listens to, and every run of its handler is announced through
//! `(start)`, `(success)` or `(fail)` notifications plus a combined one.
//!
//! # Example
//! ```ignore
//! use serde_json::json;
//! use thunk_dispatch::prelude::*;
//!
//! let model = Model::new()
//!     .state("count", json!(0))
//!     .action("increment", |state, _| {
//!         state["count"] = json!(state["count"].as_i64().unwrap_or(0) + 1);
//!         true
//!     })
//!     .thunk_on(
//!         "onIncrement",
//!         ReactiveAction::sync(|_, _, helpers| Ok(helpers.get_store_state()["count"].clone()))
//!             .targets(["@action.increment"]),
//!     );
//!
//! let store = Store::builder(model).config(StoreConfig::from_env()).build();
//! ```

// Re-export everything from core
pub use thunk_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use thunk_dispatch_core::prelude::*;

    // Assertion macros
    pub use thunk_dispatch_core::{
        assert_dispatched, assert_not_dispatched, count_dispatched, find_dispatched,
    };
}
