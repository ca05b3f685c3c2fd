mod client;
mod errors;
mod query;
pub mod types;
mod user_agent;
pub use self::client::{Client, ParsedResponse, PORTFOLIO_PATH};
pub use self::errors::Error;
pub use self::query::{Language, PortfolioQuery};
