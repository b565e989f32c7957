pub mod adapters;
pub mod identity;
pub mod session;
pub mod types;

pub use adapters::{AdapterRegistry, Subscription, WalletAdapter};
pub use identity::{IdentityLinker, LinkedWalletRecord, LinkedWalletRepository};
pub use session::{ConnectionOrchestrator, SessionEvent, SessionSynchronizer};
pub use types::*;
