//! Shipping operations.
//!
//! [`ShippingService`] covers the shipping endpoints: supported countries, city
//! search and shipping charge quotes. Weights and dimensions are sent in
//! kilograms and centimetres; [`ShippingItem::in_gateway_units`] converts from
//! the store's units.

use std::{fmt, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{GatewayError, Result},
    gateway::{GatewayClient, Operation},
    transport::{HttpTransport, Transport},
    units::{dimension_rate, weight_rate},
};

/// Longest city search string the gateway accepts.
const MAX_CITY_SEARCH_CHARS: usize = 30;

/// Shipping carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShippingMethod {
    /// DHL (code 1).
    Dhl,
    /// Aramex (code 2).
    Aramex,
}

impl ShippingMethod {
    /// Returns the carrier code used by the gateway.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Dhl => 1,
            Self::Aramex => 2,
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dhl => f.write_str("DHL"),
            Self::Aramex => f.write_str("Aramex"),
        }
    }
}

impl Serialize for ShippingMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ShippingMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(Self::Dhl),
            2 => Ok(Self::Aramex),
            other => Err(serde::de::Error::custom(format!("unknown shipping method {other}"))),
        }
    }
}

/// One cart line of a shipping quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShippingItem {
    /// Product name.
    pub product_name: String,
    /// Product description.
    #[serde(default)]
    pub description: String,
    /// Weight of one unit.
    pub weight: Decimal,
    /// Width of one unit.
    pub width: Decimal,
    /// Height of one unit.
    pub height: Decimal,
    /// Depth of one unit.
    pub depth: Decimal,
    /// Number of units.
    pub quantity: u32,
    /// Price of one unit.
    pub unit_price: Decimal,
}

impl ShippingItem {
    /// Converts weight from `weight_unit` to kilograms and dimensions from
    /// `dimension_unit` to centimetres.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedUnit`] if a unit is unknown.
    pub fn in_gateway_units(mut self, weight_unit: &str, dimension_unit: &str) -> Result<Self> {
        let weight = weight_rate(weight_unit)?;
        let dimension = dimension_rate(dimension_unit)?;
        let overflow = || GatewayError::UnsupportedUnit("converted size is out of range".to_owned());

        self.weight = self.weight.checked_mul(weight).ok_or_else(overflow)?;
        self.width = self.width.checked_mul(dimension).ok_or_else(overflow)?;
        self.height = self.height.checked_mul(dimension).ok_or_else(overflow)?;
        self.depth = self.depth.checked_mul(dimension).ok_or_else(overflow)?;
        Ok(self)
    }
}

/// Shipping charge quote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShippingChargeRequest {
    /// Carrier.
    pub shipping_method: ShippingMethod,
    /// Cart lines.
    pub items: Vec<ShippingItem>,
    /// Destination city, as returned by [`ShippingService::cities`].
    pub city_name: String,
    /// Destination postal code.
    #[serde(default)]
    pub postal_code: String,
    /// Destination country code.
    pub country_code: String,
}

/// Shipping endpoints of the gateway.
#[derive(Debug)]
pub struct ShippingService<T: Transport = HttpTransport> {
    client: Arc<GatewayClient<T>>,
}

impl<T: Transport> Clone for ShippingService<T> {
    fn clone(&self) -> Self {
        Self { client: Arc::clone(&self.client) }
    }
}

impl<T: Transport> ShippingService<T> {
    /// Creates a service on a shared client.
    #[must_use]
    pub const fn new(client: Arc<GatewayClient<T>>) -> Self {
        Self { client }
    }

    /// Lists the countries the carriers ship to.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn countries(&self) -> Result<Value> {
        self.client.call::<Value>(Operation::GetCountries, None, None).await
    }

    /// Searches the cities of `country_code` served by `method`.
    ///
    /// `search` is cut to its first 30 characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn cities(
        &self,
        method: ShippingMethod,
        country_code: &str,
        search: &str,
    ) -> Result<Value> {
        let target = cities_target(method, country_code, search);
        self.client.call_target::<Value>(Operation::GetCities, &target, None, None).await
    }

    /// Quotes the shipping charge of a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn calculate_charge(&self, request: &ShippingChargeRequest) -> Result<Value> {
        self.client.call(Operation::CalculateShippingCharge, Some(request), None).await
    }
}

fn cities_target(method: ShippingMethod, country_code: &str, search: &str) -> String {
    let search: String = search.chars().take(MAX_CITY_SEARCH_CHARS).collect();
    format!(
        "{}?shippingMethod={}&countryCode={}&searchValue={}",
        Operation::GetCities.path(),
        method.code(),
        url::form_urlencoded::byte_serialize(country_code.as_bytes()).collect::<String>(),
        url::form_urlencoded::byte_serialize(search.as_bytes()).collect::<String>(),
    )
}
