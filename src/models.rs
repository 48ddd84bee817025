use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

// ============================================================================
// Order Data Contract
// ============================================================================
//
// Wire shape of an order as it arrives on the `orders` topic and as it is
// returned by the lookup API. Field names are part of the external contract.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i16,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Payment {
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: f64,
    #[serde(default)]
    pub payment_dt: i64,
    #[serde(default)]
    pub bank: String,
    pub delivery_cost: f64,
    pub goods_total: f64,
    pub custom_fee: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: f64,
    #[serde(default)]
    pub rid: String,
    pub name: String,
    pub sale: f64,
    #[serde(default)]
    pub size: String,
    pub total_price: f64,
    pub nm_id: i64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub status: i16,
}

impl Order {
    /// Decode an order from the raw bytes of a stream message.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

// ============================================================================
// Test Fixtures
// ============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A consistent order: totals that add up, matching track numbers.
    pub fn sample_order(order_uid: &str) -> Order {
        let track_number = "WBILMTESTTRACK".to_string();
        Order {
            order_uid: order_uid.to_string(),
            track_number: track_number.clone(),
            entry: "WBIL".to_string(),
            delivery: Delivery {
                name: "Test Testov".to_string(),
                phone: "+9720000000".to_string(),
                zip: "2639809".to_string(),
                city: "Kiryat Mozkin".to_string(),
                address: "Ploshad Mira 15".to_string(),
                region: "Kraiot".to_string(),
                email: "test@gmail.com".to_string(),
            },
            payment: Payment {
                transaction: order_uid.to_string(),
                request_id: String::new(),
                currency: "USD".to_string(),
                provider: "wbpay".to_string(),
                amount: 1817.0,
                payment_dt: 1637907727,
                bank: "alpha".to_string(),
                delivery_cost: 1500.0,
                goods_total: 317.0,
                custom_fee: 0.0,
            },
            items: vec![
                Item {
                    chrt_id: 9934930,
                    track_number: track_number.clone(),
                    price: 453.0,
                    rid: "ab4219087a764ae0btest".to_string(),
                    name: "Mascaras".to_string(),
                    sale: 30.0,
                    size: "0".to_string(),
                    total_price: 317.0,
                    nm_id: 2389212,
                    brand: "Vivienne Sabo".to_string(),
                    status: 202,
                },
            ],
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shardkey: "9".to_string(),
            sm_id: 99,
            date_created: "2021-11-26T06:22:19Z".parse().expect("valid timestamp"),
            oof_shard: "1".to_string(),
        }
    }
}
