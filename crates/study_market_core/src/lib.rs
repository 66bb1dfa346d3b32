pub mod catalog;
pub mod domain;
pub mod error;
pub mod marketplace;
pub mod payment;
pub mod ports;
pub mod pricing;

pub use catalog::{FilterOptions, MarketplaceStats, NoteFilters, PriceRange, SortKey};
pub use domain::{
    NewNote, NewOrder, NewOrderFile, NewPurchase, Note, NoteStatus, Order, OrderFile, OrderStatus,
    OrderUpdate, OrderWithCustomer, Profile, ProfileUpdate, Purchase, PurchasedNote,
    UserCredentials, WishlistChange,
};
pub use error::{ActionError, ActionResult};
pub use ports::{FileStorage, MarketplaceStore, PortError, PortResult};
pub use pricing::{Estimate, Plan};
