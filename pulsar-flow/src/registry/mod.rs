//! Stage registry.
//!
//! [`StageFactory`] maps stage names to constructors and hands each new stage
//! the collaborators its metadata requires.

mod factory;

pub use factory::{CollaboratorHandle, StageFactory};
