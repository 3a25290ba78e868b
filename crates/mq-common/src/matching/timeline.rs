/// Ordered transaction-timeline buckets. Free-text descriptors from both
/// sides are normalized into these before proximity scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimelineBucket {
    Immediate,
    WithinThreeMonths,
    ThreeToSixMonths,
    SixToTwelveMonths,
    OverTwelveMonths,
}

impl TimelineBucket {
    fn index(self) -> i32 {
        match self {
            TimelineBucket::Immediate => 0,
            TimelineBucket::WithinThreeMonths => 1,
            TimelineBucket::ThreeToSixMonths => 2,
            TimelineBucket::SixToTwelveMonths => 3,
            TimelineBucket::OverTwelveMonths => 4,
        }
    }

    /// Bucket distance in steps, used by the proximity decay.
    pub fn distance(self, other: TimelineBucket) -> i32 {
        (self.index() - other.index()).abs()
    }

    pub fn parse(raw: &str) -> Option<TimelineBucket> {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let bucket = match lowered.as_str() {
            "immediate" | "asap" | "now" | "0-3 months" | "under 3 months" => {
                TimelineBucket::Immediate
            }
            "within 3 months" | "1-3 months" | "short term" => TimelineBucket::WithinThreeMonths,
            "3-6 months" | "3 to 6 months" | "medium term" => TimelineBucket::ThreeToSixMonths,
            "6-12 months" | "6 to 12 months" | "within a year" => {
                TimelineBucket::SixToTwelveMonths
            }
            "12+ months" | "over 12 months" | "1-2 years" | "long term" | "flexible" => {
                TimelineBucket::OverTwelveMonths
            }
            _ => return None,
        };

        Some(bucket)
    }
}

/// Proximity score in [0,1]: identical buckets score 1.0, each step of
/// separation subtracts `step_decay`.
pub fn proximity_score(a: TimelineBucket, b: TimelineBucket, step_decay: f64) -> f64 {
    (1.0 - a.distance(b) as f64 * step_decay).clamp(0.0, 1.0)
}
