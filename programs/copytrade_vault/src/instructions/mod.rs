pub mod admin;
pub mod execute;
pub mod transfers;
pub mod vault;
pub mod wallet;

pub use admin::*;
pub use execute::*;
pub use vault::*;
pub use wallet::*;
