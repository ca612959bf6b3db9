//! arsupport-replay: annotation replay (broadcaster peer)
//!
//! Decoded messages feed a [`ReplayStateMachine`], which keeps the stroke
//! stack and a FIFO of points waiting to be placed. Scene mutation happens
//! only in [`ReplayStateMachine::tick`], one point per call, so a burst of
//! points is spread over consecutive render frames.

pub mod anchor;
pub mod machine;
pub mod scene;

pub use anchor::Anchor;
pub use machine::{PlacementParams, ReplayState, ReplayStateMachine, ReplayStats, TickOutcome};
pub use scene::{FixedViewpoint, InMemoryScene, PlacedPoint, SceneNode, SceneRenderer, ViewpointProvider};
