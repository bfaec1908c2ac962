pub mod commands;
pub mod events;
pub mod reducer;
pub mod store;

pub use commands::SessionCommand;
pub use events::SessionEvent;
pub use reducer::reduce;
pub use store::SessionStore;
