//! Request bodies and table rows for each entity kind.

pub mod order;
pub mod product;
pub mod user;

pub use order::{LineItem, NewOrder, OrderEntity, OrderNotification, PlaceOrderRequest};
pub use product::{NewProduct, ProductEntity, RegisterProductRequest};
pub use user::{NewUser, RegisterUserRequest, UserEntity, UserView};
