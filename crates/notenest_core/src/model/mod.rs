//! Document tree domain model.
//!
//! # Responsibility
//! - Define the folder/note hierarchy persisted as one unit.
//! - Own selection invariants (`activeFolder` / `activeNote`).
//! - Provide the clock seam used for note timestamps.
//!
//! # Invariants
//! - Folder ids are unique; note ids are unique within their folder.
//! - `activeNote` is only set when it resolves inside `activeFolder`.
//! - `updatedAt` never moves backwards.

pub mod clock;
pub mod text;
pub mod tree;
