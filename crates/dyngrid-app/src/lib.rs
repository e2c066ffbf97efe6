// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bundles;
pub mod columns;
pub mod format;
pub mod forms;
pub mod grid;
pub mod ids;
pub mod interaction;
pub mod model;
pub mod restore;
pub mod sort;
pub mod state;
pub mod storage;

pub use bundles::*;
pub use columns::*;
pub use format::*;
pub use forms::*;
pub use grid::*;
pub use ids::*;
pub use interaction::*;
pub use model::*;
pub use restore::*;
pub use sort::*;
pub use state::*;
pub use storage::*;
