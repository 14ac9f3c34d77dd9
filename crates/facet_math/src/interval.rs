/// Range of ray parameters a hit may occupy.
///
/// Both ends are exclusive: a hit exactly at `min` or `max` does not count,
/// which keeps shadow rays from re-hitting the light's own distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether `t` lies strictly between the ends.
    #[inline]
    pub fn surrounds(&self, t: f32) -> bool {
        self.min < t && t < self.max
    }

    /// The same range cut off at `max`. Used to narrow the search once a
    /// closer hit is known.
    #[inline]
    pub fn with_max(self, max: f32) -> Self {
        Self {
            min: self.min,
            max: max.min(self.max),
        }
    }

    /// Every positive ray parameter. Primary and bounce rays already start
    /// offset from the surface they leave.
    pub const POSITIVE: Interval = Interval {
        min: 0.0,
        max: f32::INFINITY,
    };
}
