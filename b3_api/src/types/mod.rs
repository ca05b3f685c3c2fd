mod portfolio;
pub use self::portfolio::{Constituent, PageEnvelope, PageInfo, PortfolioHeader};
