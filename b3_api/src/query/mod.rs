mod portfolio;
pub use self::portfolio::{Language, PortfolioQuery};
