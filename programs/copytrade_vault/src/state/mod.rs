pub mod adapters_registry;
pub mod allow_list;
pub mod depositor;
pub mod global_config;
pub mod round_price;
pub mod trader_wallet;
pub mod users_vault;

pub use adapters_registry::*;
pub use allow_list::*;
pub use depositor::*;
pub use global_config::*;
pub use round_price::*;
pub use trader_wallet::*;
pub use users_vault::*;
