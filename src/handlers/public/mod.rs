// Public handlers (no authentication required): service index, health, token acquisition

pub mod root;
pub mod token;

pub use root::{health, root};
pub use token::{token_obtain, token_refresh};
