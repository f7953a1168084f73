// Handlers HTTP do add-on
pub mod credentials;
pub mod health;
pub mod sync;
pub mod token;
pub mod ui;

pub use credentials::*;
pub use health::*;
pub use sync::*;
pub use token::*;
pub use ui::*;
