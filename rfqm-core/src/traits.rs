pub use gateway::{ChainGateway, GasAttendant, SignedTransaction};
pub use maker::{BalanceCache, MakerRegistry, QuoteServerClient};
pub use store::JobStore;

mod gateway;
mod maker;
mod store;
