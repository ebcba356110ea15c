pub mod clients;
pub mod documents;
pub mod inventory;
pub mod settings;
pub mod sync;
