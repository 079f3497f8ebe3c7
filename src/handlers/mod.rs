pub mod confirmation;
pub mod estimation;
pub mod identification;
pub mod session;

pub use estimation::EstimationService;
pub use identification::FoodIdentifier;
pub use session::{Session, SessionError, SessionEvent, SessionHandler, SessionState};
