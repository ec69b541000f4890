//! Pure election logic: pricing, per-request state, token-step decisions.

mod price;
mod ring_logic;
mod state;

pub use price::PriceBand;
pub use ring_logic::{token_step, TokenAction};
pub use state::{ElectionState, Participation};
