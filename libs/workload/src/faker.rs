use chrono::{DateTime, Duration, Utc};
use fake::faker::address::en::{CityName, CountryName};
use fake::Fake;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Значения, которые faker-коллаборатор может вернуть как способ оплаты.
const PAYMENT_METHODS: [&str; 4] = ["deposit", "withdrawal", "payment", "invoice"];

const PAST_WINDOW_SECS: i64 = 365 * 24 * 3600;
const RECENT_WINDOW_SECS: i64 = 24 * 3600;

/// Injected randomness capability used by the sampling policy and the
/// record generators. Everything random in a loop goes through one of
/// these, so a seeded implementation makes a loop reproducible.
pub trait Faker: Send {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer in `[min, max]`.
    fn int(&mut self, min: i64, max: i64) -> i64;

    /// Uniform float in `[min, max]`, rounded to `precision` decimal places.
    fn float(&mut self, min: f64, max: f64, precision: u32) -> f64;

    fn boolean(&mut self) -> bool;

    fn city(&mut self) -> String;

    fn country(&mut self) -> String;

    fn payment_method(&mut self) -> String;

    /// Instant within the last year before `now`.
    fn past_date(&mut self, now: DateTime<Utc>) -> DateTime<Utc>;

    /// Instant within the last day before `now`.
    fn recent_date(&mut self, now: DateTime<Utc>) -> DateTime<Utc>;
}

/// Round `value` to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

// ═══════════════════════════════════════════════════════════════
//  SeededFaker
// ═══════════════════════════════════════════════════════════════

/// `Faker` over ChaCha8 with names from the `fake` crate.
pub struct SeededFaker {
    rng: ChaCha8Rng,
}

impl SeededFaker {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: ChaCha8Rng::from_entropy() }
    }
}

impl Faker for SeededFaker {
    fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    fn int(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn float(&mut self, min: f64, max: f64, precision: u32) -> f64 {
        if min >= max {
            return round_to(min, precision);
        }
        let v = self.rng.gen_range(min..=max);
        round_to(v, precision).clamp(min, max)
    }

    fn boolean(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn city(&mut self) -> String {
        CityName().fake_with_rng(&mut self.rng)
    }

    fn country(&mut self) -> String {
        CountryName().fake_with_rng(&mut self.rng)
    }

    fn payment_method(&mut self) -> String {
        let idx = self.rng.gen_range(0..PAYMENT_METHODS.len());
        PAYMENT_METHODS[idx].to_string()
    }

    fn past_date(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::seconds(self.rng.gen_range(1..=PAST_WINDOW_SECS))
    }

    fn recent_date(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::milliseconds(self.rng.gen_range(0..=RECENT_WINDOW_SECS * 1000))
    }
}
