/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64); // seconds

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn seconds(s: f64) -> Self {
        Self(s)
    }

    pub fn elapsed_since(&self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
