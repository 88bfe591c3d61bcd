//! Product registration rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use order_desk_core::{Partition, ProductId};

use super::user::non_blank;
use crate::store::TableEntity;
use crate::validation::{ValidationErrors, Validator, ViolationKind};

const MISSING_FIELDS: &str = "Please provide productName, price, and quantity.";
const INVALID_NUMBERS: &str = "Price must be a number, and quantity must be an integer.";

/// `POST /registerProduct` body.
///
/// `price` and `quantity` may arrive as JSON strings or numbers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    pub product_name: Option<String>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
    pub image_url: Option<String>,
}

#[derive(Debug)]
pub struct NewProduct {
    pub product_name: String,
    pub price: f64,
    pub quantity: i32,
    pub image_url: Option<String>,
}

impl RegisterProductRequest {
    /// Check required fields, then parse `price` and `quantity`.
    ///
    /// # Errors
    ///
    /// Returns every violation found. The summary names missing fields when
    /// any are missing, and the numeric rule otherwise.
    pub fn validate(self) -> Result<NewProduct, ValidationErrors> {
        let mut v = Validator::new();

        let product_name = v.required_str("productName", self.product_name.as_deref());
        let price = v.required_f64("price", self.price.as_ref());
        let quantity = v.required_i32("quantity", self.quantity.as_ref());

        let product = match (product_name, price, quantity) {
            (Some(product_name), Some(price), Some(quantity)) => Some(NewProduct {
                product_name,
                price,
                quantity,
                image_url: non_blank(self.image_url),
            }),
            _ => None,
        };

        v.conclude(product, |violations| {
            if violations.iter().any(|x| x.kind == ViolationKind::Missing) {
                MISSING_FIELDS.to_string()
            } else {
                INVALID_NUMBERS.to_string()
            }
        })
    }
}

/// A stored product, keyed by its generated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl ProductEntity {
    /// Assign a fresh id and creation time.
    #[must_use]
    pub fn new(product: NewProduct) -> Self {
        Self {
            product_id: ProductId::generate(),
            product_name: product.product_name,
            price: product.price,
            quantity: product.quantity,
            image_url: product.image_url,
            created_date: Utc::now(),
        }
    }
}

impl TableEntity for ProductEntity {
    const PARTITION: Partition = Partition::Products;

    fn row_key(&self) -> String {
        self.product_id.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(price: Value, quantity: Value) -> RegisterProductRequest {
        serde_json::from_value(json!({
            "productName": "Widget",
            "price": price,
            "quantity": quantity,
        }))
        .unwrap()
    }

    #[test]
    fn test_string_numbers_accepted() {
        let product = request(json!("19.99"), json!("3")).validate().unwrap();
        assert!((product.price - 19.99).abs() < f64::EPSILON);
        assert_eq!(product.quantity, 3);
    }

    #[test]
    fn test_non_numeric_price_rejected() {
        let err = request(json!("abc"), json!("3")).validate().unwrap_err();
        assert_eq!(err.summary, INVALID_NUMBERS);
        assert!(err.has_field("price"));
    }

    #[test]
    fn test_fractional_quantity_rejected() {
        let err = request(json!("19.99"), json!("3.5")).validate().unwrap_err();
        assert_eq!(err.summary, INVALID_NUMBERS);
        assert!(err.has_field("quantity"));
    }

    #[test]
    fn test_missing_takes_precedence_in_summary() {
        let req: RegisterProductRequest =
            serde_json::from_value(json!({"price": "abc", "quantity": "1"})).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(err.summary, MISSING_FIELDS);
        assert!(err.has_field("productName"));
        assert!(err.has_field("price"));
    }

    #[test]
    fn test_entity_row_key_is_product_id() {
        let product = ProductEntity::new(request(json!(1.5), json!(1)).validate().unwrap());
        assert_eq!(product.row_key(), product.product_id.to_string());
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["productName"], "Widget");
        assert_eq!(json["productId"], product.product_id.to_string());
    }
}
