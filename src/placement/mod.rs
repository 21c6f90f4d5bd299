pub mod placed;
pub mod workflow;

pub use placed::{PlacedBet, PlacedBetId, PlacedBetKind};
pub use workflow::{
    BetPlacer, PlacementDelays, PlacementError, PlacementReceipt, PlacementResult, PlacementStage,
};
