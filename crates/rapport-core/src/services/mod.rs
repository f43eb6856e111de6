//! Service facades shared by every caller of the engine.

mod contacts;

pub use contacts::ContactSyncService;
