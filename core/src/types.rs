//! Shared primitive types used across the engine.

/// Identifier of a single analysis run.
pub type RunId = String;

/// Product stock-keeping unit.
pub type Sku = String;

/// Store (branch) identifier.
pub type StoreId = String;

/// Customer or operator identifier attached to a movement.
pub type ActorId = String;
