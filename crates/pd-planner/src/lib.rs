//! `pd-planner`: anytime Monte-Carlo tree search over intentions.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`mcts`]      | `Planner`: start / iterate / re-root / report utilities     |
//! | [`tree`]      | `Tree` arena, `Node`, `NodeId`, compaction                  |
//! | [`snapshot`]  | `WorldSnapshot`: frozen free parcels by tile                |
//! | [`scheduler`] | `Scheduler`, `StopToken`                                    |
//! | [`error`]     | `PlannerError`, `PlannerResult<T>`                          |
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut planner = Planner::new(engine, &config);
//! planner.start(position, clock.now(), WorldSnapshot::capture(&belief, clock.now()));
//! let mut sched = Scheduler::new(config.iterations_per_tick);
//! loop {
//!     sched.run_quantum(&mut planner)?;
//!     let ranked = planner.compute_intention_utilities(clock.now())?;
//!     // ... act on ranked[0], then planner.execute_intention(&chosen)?
//! }
//! ```

pub mod error;
pub mod mcts;
pub mod scheduler;
pub mod snapshot;
pub mod tree;


pub use error::{PlannerError, PlannerResult};
pub use mcts::Planner;
pub use scheduler::{Scheduler, StopToken};
pub use snapshot::WorldSnapshot;
pub use tree::{Node, NodeId, Tree};
