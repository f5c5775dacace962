use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use churn_api::{CollectionKind, Document, OperationKind};

use crate::error::GenerationError;
use crate::faker::Faker;

// ═══════════════════════════════════════════════════════════════
//  Decimal2
// ═══════════════════════════════════════════════════════════════

/// Money/geo value rendered as a fixed 2-place decimal string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decimal2(pub f64);

impl Serialize for Decimal2 {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        // Всё, что округляется до нуля, пишем без знака: "0.00", не "-0.00".
        let v = if self.0.abs() < 0.005 { 0.0 } else { self.0 };
        s.serialize_str(&format!("{v:.2}"))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Record shapes
// ═══════════════════════════════════════════════════════════════

/// Lifecycle envelope of a freshly created record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    action: OperationKind,
}

impl Envelope {
    fn created(now: DateTime<Utc>) -> Self {
        Self { created_at: now, updated_at: now, is_deleted: false, action: OperationKind::Insert }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserProfile {
    #[serde(flatten)]
    envelope: Envelope,
    user_id: i64,
    score: f64,
    age: i64,
    height_in_cm: i64,
    weight_in_kg: f64,
    account_balance: Decimal2,
    transaction_count: i64,
    login_attempts: i64,
    average_session_time_in_minutes: f64,
    is_active: bool,
    last_login: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Geolocation {
    #[serde(flatten)]
    envelope: Envelope,
    user_id: i64,
    latitude: Decimal2,
    longitude: Decimal2,
    city: String,
    country: String,
    timestamp: DateTime<Utc>,
    is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sale {
    #[serde(flatten)]
    envelope: Envelope,
    product_id: i64,
    user_id: i64,
    price: Decimal2,
    quantity: i64,
    sale_date: DateTime<Utc>,
    store_location: String,
    payment_method: String,
}

/// Fields refreshed on every update, regardless of kind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Touch {
    updated_at: DateTime<Utc>,
    action: OperationKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserProfileUpdate {
    #[serde(flatten)]
    touch: Touch,
    account_balance: Decimal2,
    score: f64,
    is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeolocationUpdate {
    #[serde(flatten)]
    touch: Touch,
    latitude: Decimal2,
    longitude: Decimal2,
    is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleUpdate {
    #[serde(flatten)]
    touch: Touch,
    price: Decimal2,
    quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SoftDelete {
    is_deleted: bool,
    deleted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    action: OperationKind,
}

// ═══════════════════════════════════════════════════════════════
//  Generators
// ═══════════════════════════════════════════════════════════════

fn to_document<T: Serialize>(record: &T) -> Result<Document, GenerationError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(GenerationError::NotAnObject),
    }
}

/// Новый документ для коллекции `kind`. Все случайные значения берутся
/// из `faker`, время — из `now`.
pub fn generate(
    kind: CollectionKind,
    faker: &mut dyn Faker,
    now: DateTime<Utc>,
) -> Result<Document, GenerationError> {
    let envelope = Envelope::created(now);
    match kind {
        CollectionKind::UserProfile => to_document(&UserProfile {
            envelope,
            user_id: faker.int(1, 10_000),
            score: faker.float(0.0, 100.0, 2),
            age: faker.int(18, 70),
            height_in_cm: faker.int(150, 200),
            weight_in_kg: faker.float(50.0, 100.0, 2),
            account_balance: Decimal2(faker.float(100.0, 10_000.0, 2)),
            transaction_count: faker.int(1, 50),
            login_attempts: faker.int(0, 10),
            average_session_time_in_minutes: faker.float(5.0, 60.0, 2),
            is_active: faker.boolean(),
            last_login: faker.past_date(now),
        }),
        CollectionKind::Geolocation => to_document(&Geolocation {
            envelope,
            user_id: faker.int(1, 10_000),
            latitude: Decimal2(faker.float(-90.0, 90.0, 2)),
            longitude: Decimal2(faker.float(-180.0, 180.0, 2)),
            city: faker.city(),
            country: faker.country(),
            timestamp: faker.recent_date(now),
            is_active: faker.boolean(),
        }),
        CollectionKind::Sales => to_document(&Sale {
            envelope,
            product_id: faker.int(1, 5_000),
            user_id: faker.int(1, 10_000),
            price: Decimal2(faker.float(10.0, 1_000.0, 2)),
            quantity: faker.int(1, 10),
            sale_date: faker.recent_date(now),
            store_location: faker.city(),
            payment_method: faker.payment_method(),
        }),
    }
}

/// `count` fresh records for one bulk insert.
pub fn generate_batch(
    kind: CollectionKind,
    count: usize,
    faker: &mut dyn Faker,
    now: DateTime<Utc>,
) -> Result<Vec<Document>, GenerationError> {
    (0..count).map(|_| generate(kind, faker, now)).collect()
}

/// Kind-specific fields for one point update, with the envelope refreshed
/// (`updatedAt`, `action = update`).
pub fn mutation(
    kind: CollectionKind,
    faker: &mut dyn Faker,
    now: DateTime<Utc>,
) -> Result<Document, GenerationError> {
    let touch = Touch { updated_at: now, action: OperationKind::Update };
    match kind {
        CollectionKind::UserProfile => to_document(&UserProfileUpdate {
            touch,
            account_balance: Decimal2(faker.float(100.0, 10_000.0, 2)),
            score: faker.float(0.0, 100.0, 2),
            is_active: faker.boolean(),
        }),
        CollectionKind::Geolocation => to_document(&GeolocationUpdate {
            touch,
            latitude: Decimal2(faker.float(-90.0, 90.0, 2)),
            longitude: Decimal2(faker.float(-180.0, 180.0, 2)),
            is_active: faker.boolean(),
        }),
        CollectionKind::Sales => to_document(&SaleUpdate {
            touch,
            price: Decimal2(faker.float(10.0, 1_000.0, 2)),
            quantity: faker.int(1, 10),
        }),
    }
}

/// Soft delete: flag flip plus refreshed timestamps. Never a physical remove.
pub fn soft_delete(now: DateTime<Utc>) -> Result<Document, GenerationError> {
    to_document(&SoftDelete {
        is_deleted: true,
        deleted_at: now,
        updated_at: now,
        action: OperationKind::Delete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faker::SeededFaker;
    use churn_api::fields;
    use serde_json::Value;

    fn int_in(doc: &Document, field: &str, lo: i64, hi: i64) {
        let v = doc[field].as_i64().unwrap_or_else(|| panic!("{field} not an int"));
        assert!((lo..=hi).contains(&v), "{field}={v} not in [{lo},{hi}]");
    }

    fn float_in(doc: &Document, field: &str, lo: f64, hi: f64) {
        let v = doc[field].as_f64().unwrap_or_else(|| panic!("{field} not a number"));
        assert!(v >= lo && v <= hi, "{field}={v} not in [{lo},{hi}]");
    }

    fn decimal_in(doc: &Document, field: &str, lo: f64, hi: f64) {
        let s = doc[field].as_str().unwrap_or_else(|| panic!("{field} not a string"));
        let (_, frac) = s.split_once('.').unwrap_or_else(|| panic!("{field}={s} has no point"));
        assert_eq!(frac.len(), 2, "{field}={s}");
        let v: f64 = s.parse().unwrap();
        assert!(v >= lo && v <= hi, "{field}={v} not in [{lo},{hi}]");
    }

    fn envelope_ok(doc: &Document) {
        assert_eq!(doc[fields::IS_DELETED], Value::Bool(false));
        assert_eq!(doc[fields::ACTION], Value::from("insert"));
        assert!(doc[fields::CREATED_AT].is_string());
        assert!(doc[fields::UPDATED_AT].is_string());
        assert!(!doc.contains_key(fields::DELETED_AT));
    }

    #[test]
    fn decimal_near_zero_renders_unsigned() {
        assert_eq!(serde_json::to_value(Decimal2(-0.0)).unwrap(), "0.00");
        assert_eq!(serde_json::to_value(Decimal2(-0.004)).unwrap(), "0.00");
        assert_eq!(serde_json::to_value(Decimal2(-0.01)).unwrap(), "-0.01");
        assert_eq!(serde_json::to_value(Decimal2(12.5)).unwrap(), "12.50");
    }

    #[test]
    fn user_profile_attributes_in_bounds() {
        let mut f = SeededFaker::seeded(100);
        let now = Utc::now();
        for _ in 0..500 {
            let d = generate(CollectionKind::UserProfile, &mut f, now).unwrap();
            envelope_ok(&d);
            int_in(&d, "userId", 1, 10_000);
            float_in(&d, "score", 0.0, 100.0);
            int_in(&d, "age", 18, 70);
            int_in(&d, "heightInCm", 150, 200);
            float_in(&d, "weightInKg", 50.0, 100.0);
            decimal_in(&d, "accountBalance", 100.0, 10_000.0);
            int_in(&d, "transactionCount", 1, 50);
            int_in(&d, "loginAttempts", 0, 10);
            float_in(&d, "averageSessionTimeInMinutes", 5.0, 60.0);
            assert!(d["isActive"].is_boolean());
            assert!(d["lastLogin"].is_string());
        }
    }

    #[test]
    fn geolocation_attributes_in_bounds() {
        let mut f = SeededFaker::seeded(101);
        let now = Utc::now();
        for _ in 0..500 {
            let d = generate(CollectionKind::Geolocation, &mut f, now).unwrap();
            envelope_ok(&d);
            int_in(&d, "userId", 1, 10_000);
            decimal_in(&d, "latitude", -90.0, 90.0);
            decimal_in(&d, "longitude", -180.0, 180.0);
            assert!(!d["city"].as_str().unwrap().is_empty());
            assert!(!d["country"].as_str().unwrap().is_empty());
            assert!(d["timestamp"].is_string());
        }
    }

    #[test]
    fn sales_attributes_in_bounds() {
        let mut f = SeededFaker::seeded(102);
        let now = Utc::now();
        for _ in 0..500 {
            let d = generate(CollectionKind::Sales, &mut f, now).unwrap();
            envelope_ok(&d);
            int_in(&d, "productId", 1, 5_000);
            int_in(&d, "userId", 1, 10_000);
            decimal_in(&d, "price", 10.0, 1_000.0);
            int_in(&d, "quantity", 1, 10);
            assert!(d["saleDate"].is_string());
            assert!(!d["storeLocation"].as_str().unwrap().is_empty());
            assert!(!d["paymentMethod"].as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn decimal_keeps_trailing_zeros() {
        assert_eq!(serde_json::to_value(Decimal2(10.0)).unwrap(), Value::from("10.00"));
        assert_eq!(serde_json::to_value(Decimal2(-0.5)).unwrap(), Value::from("-0.50"));
    }

    #[test]
    fn same_seed_same_record() {
        let now = Utc::now();
        let a = generate(CollectionKind::Sales, &mut SeededFaker::seeded(9), now).unwrap();
        let b = generate(CollectionKind::Sales, &mut SeededFaker::seeded(9), now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mutation_fields_per_kind() {
        let mut f = SeededFaker::seeded(103);
        let now = Utc::now();

        let u = mutation(CollectionKind::UserProfile, &mut f, now).unwrap();
        let mut keys: Vec<_> = u.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["accountBalance", "action", "isActive", "score", "updatedAt"]);
        assert_eq!(u[fields::ACTION], Value::from("update"));
        decimal_in(&u, "accountBalance", 100.0, 10_000.0);

        let g = mutation(CollectionKind::Geolocation, &mut f, now).unwrap();
        decimal_in(&g, "latitude", -90.0, 90.0);
        decimal_in(&g, "longitude", -180.0, 180.0);
        assert!(!g.contains_key(fields::IS_DELETED));

        let s = mutation(CollectionKind::Sales, &mut f, now).unwrap();
        decimal_in(&s, "price", 10.0, 1_000.0);
        int_in(&s, "quantity", 1, 10);
    }

    #[test]
    fn soft_delete_fields() {
        let d = soft_delete(Utc::now()).unwrap();
        assert_eq!(d[fields::IS_DELETED], Value::Bool(true));
        assert_eq!(d[fields::ACTION], Value::from("delete"));
        assert!(d[fields::DELETED_AT].is_string());
        assert!(d[fields::UPDATED_AT].is_string());
    }

    #[test]
    fn batch_has_requested_size() {
        let mut f = SeededFaker::seeded(104);
        let batch = generate_batch(CollectionKind::Geolocation, 7, &mut f, Utc::now()).unwrap();
        assert_eq!(batch.len(), 7);
    }
}
