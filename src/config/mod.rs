//! Configuration module

mod site;

pub use site::BackendConfig;
pub use site::CommentsConfig;
pub use site::SiteConfig;
pub use site::TOKEN_ENV;
