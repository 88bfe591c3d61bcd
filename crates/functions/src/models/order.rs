//! Orders, their line items, and the queue notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use order_desk_core::{Email, OrderId, OrderStatus, Partition};

use crate::store::TableEntity;
use crate::validation::{ValidationErrors, Validator, ViolationKind};

const MISSING_DETAILS: &str = "Please provide customer details and at least one product.";
const INVALID_DETAILS: &str = "Please provide valid customer details and products.";

/// `POST /placeOrder` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub total_amount: Option<Value>,
    pub products: Option<Vec<LineItemRequest>>,
}

/// One line item as submitted. Fields other than `name`, `quantity` and
/// `price` are carried through untouched.
#[derive(Debug, Default, Deserialize)]
pub struct LineItemRequest {
    pub name: Option<String>,
    #[serde(alias = "qty")]
    pub quantity: Option<Value>,
    pub price: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A line item copied into the order at placement time.
///
/// Not a reference to a product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(alias = "qty")]
    pub quantity: i32,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: String,
    pub total_amount: f64,
    pub products: Vec<LineItem>,
}

impl PlaceOrderRequest {
    /// Check customer details and every line item.
    ///
    /// # Errors
    ///
    /// Returns every violation found, with paths such as `products[1].price`.
    pub fn validate(self) -> Result<NewOrder, ValidationErrors> {
        let mut v = Validator::new();

        let customer_name = v.required_str("customerName", self.customer_name.as_deref());
        let customer_email = v
            .required_str("customerEmail", self.customer_email.as_deref())
            .and_then(|raw| match Email::parse(&raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    v.invalid("customerEmail", e.to_string());
                    None
                }
            });
        let customer_phone = v.required_str("customerPhone", self.customer_phone.as_deref());
        let total_amount = v.required_f64("totalAmount", self.total_amount.as_ref());

        let products = match self.products {
            None => {
                v.missing("products");
                None
            }
            Some(items) if items.is_empty() => {
                v.empty("products");
                None
            }
            Some(items) => validate_line_items(&mut v, items),
        };

        let order = match (
            customer_name,
            customer_email,
            customer_phone,
            total_amount,
            products,
        ) {
            (Some(customer_name), Some(customer_email), Some(customer_phone), Some(total_amount), Some(products)) => {
                Some(NewOrder {
                    customer_name,
                    customer_email,
                    customer_phone,
                    total_amount,
                    products,
                })
            }
            _ => None,
        };

        v.conclude(order, |violations| {
            if violations
                .iter()
                .any(|x| matches!(x.kind, ViolationKind::Missing | ViolationKind::Empty))
            {
                MISSING_DETAILS.to_string()
            } else {
                INVALID_DETAILS.to_string()
            }
        })
    }
}

fn validate_line_items(v: &mut Validator, items: Vec<LineItemRequest>) -> Option<Vec<LineItem>> {
    let mut valid = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let name = v.required_str(&format!("products[{i}].name"), item.name.as_deref());

        let quantity_field = format!("products[{i}].quantity");
        let quantity = v
            .required_i32(&quantity_field, item.quantity.as_ref())
            .filter(|q| {
                let positive = *q > 0;
                if !positive {
                    v.invalid(&quantity_field, format!("{quantity_field} must be at least 1"));
                }
                positive
            });

        let price_field = format!("products[{i}].price");
        let price = v.required_f64(&price_field, item.price.as_ref()).filter(|p| {
            let non_negative = *p >= 0.0;
            if !non_negative {
                v.invalid(&price_field, format!("{price_field} must not be negative"));
            }
            non_negative
        });

        if let (Some(name), Some(quantity), Some(price)) = (name, quantity, price) {
            valid.push(LineItem {
                name,
                quantity,
                price,
                extra: item.extra,
            });
        }
    }

    v.is_valid().then_some(valid)
}

/// A stored order, keyed by its generated id.
///
/// `products` is the JSON text of the line items, kept as a single string
/// property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntity {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: String,
    pub total_amount: f64,
    pub order_status: OrderStatus,
    pub date: DateTime<Utc>,
    pub products: String,
}

impl OrderEntity {
    /// Build a `Processing` order stamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the line items cannot be serialized.
    pub fn new(order_id: OrderId, order: &NewOrder) -> Result<Self, serde_json::Error> {
        Ok(Self {
            order_id,
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            total_amount: order.total_amount,
            order_status: OrderStatus::Processing,
            date: Utc::now(),
            products: serde_json::to_string(&order.products)?,
        })
    }

    /// Decode the embedded line items.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored blob is not a line item list.
    pub fn line_items(&self) -> Result<Vec<LineItem>, serde_json::Error> {
        serde_json::from_str(&self.products)
    }
}

impl TableEntity for OrderEntity {
    const PARTITION: Partition = Partition::Orders;

    fn row_key(&self) -> String {
        self.order_id.to_string()
    }
}

/// Queue message published for each placed order.
///
/// Field names are PascalCase; downstream consumers read them as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Email,
    pub products: Vec<LineItem>,
    pub total_amount: f64,
    pub date: DateTime<Utc>,
    pub order_status: OrderStatus,
}

impl OrderNotification {
    /// Mirror `order`, carrying the structured line items instead of the blob.
    #[must_use]
    pub fn new(order: &OrderEntity, products: Vec<LineItem>) -> Self {
        Self {
            order_id: order.order_id,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_email: order.customer_email.clone(),
            products,
            total_amount: order.total_amount,
            date: order.date,
            order_status: order.order_status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(products: Value) -> PlaceOrderRequest {
        serde_json::from_value(json!({
            "customerName": "Ada Lovelace",
            "customerEmail": "ada@example.com",
            "customerPhone": "555-0100",
            "totalAmount": 10.0,
            "products": products,
        }))
        .unwrap()
    }

    #[test]
    fn test_qty_alias_and_extra_fields() {
        let order = request(json!([{"name": "Widget", "qty": 2, "price": 5.0, "sku": "W-1"}]))
            .validate()
            .unwrap();
        assert_eq!(order.products.len(), 1);
        let item = &order.products[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.extra["sku"], "W-1");
    }

    #[test]
    fn test_empty_products_rejected() {
        let err = request(json!([])).validate().unwrap_err();
        assert_eq!(err.summary, MISSING_DETAILS);
        assert!(err.has(ViolationKind::Empty));
    }

    #[test]
    fn test_line_item_violations_have_paths() {
        let err = request(json!([
            {"name": "Widget", "quantity": 1, "price": 1.0},
            {"name": "", "quantity": "many", "price": -1}
        ]))
        .validate()
        .unwrap_err();

        assert!(err.has_field("products[1].name"));
        assert!(err.has_field("products[1].quantity"));
        assert!(err.has_field("products[1].price"));
        assert!(!err.has_field("products[0].name"));
    }

    #[test]
    fn test_missing_everything() {
        let err = PlaceOrderRequest::default().validate().unwrap_err();
        assert_eq!(err.summary, MISSING_DETAILS);
        for field in ["customerName", "customerEmail", "customerPhone", "totalAmount", "products"] {
            assert!(err.has_field(field), "{field} not reported");
        }
    }

    #[test]
    fn test_blob_round_trips_line_items() {
        let new_order = request(json!([{"name": "Widget", "qty": 2, "price": 5.0}]))
            .validate()
            .unwrap();
        let entity = OrderEntity::new(OrderId::generate(), &new_order).unwrap();
        assert_eq!(entity.order_status, OrderStatus::Processing);
        assert_eq!(entity.line_items().unwrap(), new_order.products);

        let stored: Value = serde_json::from_str(&entity.products).unwrap();
        assert_eq!(stored, json!([{"name": "Widget", "quantity": 2, "price": 5.0}]));
    }

    #[test]
    fn test_notification_is_pascal_case() {
        let new_order = request(json!([{"name": "Widget", "qty": 2, "price": 5.0}]))
            .validate()
            .unwrap();
        let entity = OrderEntity::new(OrderId::generate(), &new_order).unwrap();
        let note = OrderNotification::new(&entity, new_order.products);
        let json = serde_json::to_value(&note).unwrap();

        assert_eq!(json["OrderId"], entity.order_id.to_string());
        assert_eq!(json["OrderStatus"], "Processing");
        assert_eq!(json["CustomerEmail"], "ada@example.com");
        assert_eq!(json["Products"][0]["name"], "Widget");
        assert!(json.get("orderId").is_none());
    }
}
