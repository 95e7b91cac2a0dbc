use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FieldErrors;
use crate::models::price::{Price, PriceError};

pub const DEFAULT_NAME: &str = "Unnamed Product";
pub const NAME_MAX_CHARS: usize = 100;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_BOOLEAN: &str = "Must be a valid boolean.";

/// Stored product, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the `products` table. Prices are kept as integer cents.
#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = PriceError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Price::from_cents(row.price_cents)?,
            is_available: row.is_available,
            created_at: row.created_at,
        })
    }
}

/// Typed partial input; omitted fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub is_available: Option<bool>,
}

/// A validated product that has not been stored yet (no id, no timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub is_available: bool,
}

impl NewProduct {
    /// Apply defaults to `input` and check the record constraints.
    pub fn with_defaults(input: ProductInput) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = input.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        if name.trim().is_empty() {
            errors.add("name", NOT_BLANK);
        } else if name.chars().count() > NAME_MAX_CHARS {
            errors.add(
                "name",
                format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
            );
        }

        if input.price.is_none() {
            errors.add("price", REQUIRED);
        }

        match input.price {
            Some(price) if errors.is_empty() => Ok(Self {
                name,
                description: input.description.unwrap_or_default(),
                price,
                is_available: input.is_available.unwrap_or(false),
            }),
            _ => Err(errors),
        }
    }

    /// Coerce an inbound JSON body into a new product.
    ///
    /// Every offending field is reported, not just the first one. `id`,
    /// `created_at` and unknown keys are ignored.
    pub fn from_wire(body: &Value) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let Some(fields) = body.as_object() else {
            errors.add(
                "non_field_errors",
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(body)
                ),
            );
            return Err(errors);
        };

        let input = ProductInput {
            name: coerce_field(fields, "name", coerce_text, &mut errors),
            description: coerce_field(fields, "description", coerce_text, &mut errors),
            price: coerce_field(fields, "price", coerce_price, &mut errors),
            is_available: coerce_field(fields, "is_available", coerce_bool, &mut errors),
        };

        match Self::with_defaults(input) {
            Ok(product) if errors.is_empty() => Ok(product),
            Ok(_) => Err(errors),
            Err(more) => {
                errors.merge_new_fields(more);
                Err(errors)
            }
        }
    }

    /// Attach the store-assigned identity.
    pub fn into_product(self, id: i64, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            is_available: self.is_available,
            created_at,
        }
    }
}

fn coerce_field<T>(
    fields: &Map<String, Value>,
    key: &'static str,
    coerce: fn(&Value) -> Result<T, String>,
    errors: &mut FieldErrors,
) -> Option<T> {
    let value = fields.get(key)?;
    match coerce(value) {
        Ok(v) => Some(v),
        Err(message) => {
            errors.add(key, message);
            None
        }
    }
}

fn coerce_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(NOT_NULL.to_string()),
        _ => Err(NOT_STRING.to_string()),
    }
}

fn coerce_price(value: &Value) -> Result<Price, String> {
    let parsed = match value {
        Value::String(s) => s.parse::<Price>(),
        Value::Number(n) => n.to_string().parse::<Price>(),
        Value::Null => return Err(NOT_NULL.to_string()),
        _ => Err(PriceError::Invalid),
    };
    parsed.map_err(|e| e.to_string())
}

fn coerce_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(true),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "t" | "y" | "yes" | "true" | "on" | "1" => Ok(true),
            "f" | "n" | "no" | "false" | "off" | "0" => Ok(false),
            _ => Err(NOT_BOOLEAN.to_string()),
        },
        Value::Null => Err(NOT_NULL.to_string()),
        _ => Err(NOT_BOOLEAN.to_string()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
