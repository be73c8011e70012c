pub mod cart;
pub mod cart_item;
pub mod flower;
pub mod order;
pub mod order_item;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use flower::{Entity as Flower, Model as FlowerModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
