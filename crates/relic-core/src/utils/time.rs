//! Time helpers.

use chrono::Utc;

/// Current wall-clock time as a unix timestamp in seconds
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_unix_is_recent() {
        // Anything after 2020-01-01 counts as a sane clock here.
        assert!(now_unix() > 1_577_836_800);
    }
}
