// limiter.rs — Per-category token buckets.
//
// Buckets refill on the monotonic clock (Instant), so wall-clock jumps
// cannot mint tokens. Buckets are process-local: replicas of the proxy do
// not share them, which is documented as a deployment limitation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::evaluate::Decision;
use crate::model::RateLimitRule;

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_ts: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            tokens: f64::from(capacity),
            refill_per_sec,
            last_ts: Instant::now(),
        }
    }

    fn consume(&mut self, count: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_ts).as_secs_f64();
        self.last_ts = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if self.tokens < count {
            return false;
        }
        self.tokens -= count;
        true
    }
}

/// In-memory rate limiter keyed by request category ("run", "fetch", ...).
///
/// Uses a sync [`Mutex`] since the critical section is short and never
/// awaits. Categories without a configured rule are always allowed.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(rules: &[RateLimitRule]) -> Self {
        let buckets = rules
            .iter()
            .map(|rule| {
                (
                    rule.category.clone(),
                    TokenBucket::new(rule.capacity, rule.refill_per_sec),
                )
            })
            .collect();
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Take one token from the category's bucket, if a rule exists for it.
    pub fn check(&self, category: &str) -> Decision {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(bucket) = buckets.get_mut(category) else {
            return Decision::allow("no rate limit configured", "rate_default_allow");
        };
        if bucket.consume(1.0) {
            Decision::allow("within rate limit", "rate_allow")
        } else {
            Decision::block("rate limit exceeded", "rate_limit_block")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(category: &str, capacity: u32, refill_per_sec: f64) -> RateLimitRule {
        RateLimitRule {
            category: category.to_string(),
            capacity,
            refill_per_sec,
        }
    }

    #[test]
    fn unknown_category_is_allowed() {
        let limiter = RateLimiter::new(&[]);
        let decision = limiter.check("run");
        assert!(decision.allowed);
        assert_eq!(decision.rule_id, "rate_default_allow");
    }

    #[test]
    fn blocks_after_capacity_without_refill() {
        let limiter = RateLimiter::new(&[rule("run", 3, 0.0)]);
        let mut allowed = 0;
        for _ in 0..5 {
            if limiter.check("run").allowed {
                allowed += 1;
            }
        }
        // Exactly capacity calls succeed when the clock does not advance.
        assert_eq!(allowed, 3);
        assert_eq!(limiter.check("run").rule_id, "rate_limit_block");
    }

    #[test]
    fn refill_restores_tokens() {
        let limiter = RateLimiter::new(&[rule("fetch", 1, 1000.0)]);
        assert!(limiter.check("fetch").allowed);
        // At 1000 tokens/sec even a few milliseconds refill the bucket.
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(limiter.check("fetch").allowed);
    }

    #[test]
    fn categories_are_independent() {
        let limiter = RateLimiter::new(&[rule("run", 1, 0.0), rule("fetch", 1, 0.0)]);
        assert!(limiter.check("run").allowed);
        assert!(limiter.check("fetch").allowed);
        assert!(!limiter.check("run").allowed);
    }
}
