use std::fmt;

/// Fixed-point scale: one degree is `10_000_000` coordinate units.
pub const COORDINATE_PRECISION: i32 = 10_000_000;

/// Raw value marking a coordinate that has not been set.
pub const UNDEFINED_COORDINATE: i32 = i32::MAX;

/// A geographic position stored as fixed-point integers.
///
/// Longitude (`x`) and latitude (`y`) are kept in units of 1e-7 degrees,
/// which is the resolution map data is usually published with and keeps
/// the type `Copy` and `Eq`.
///
/// ```text
/// ┌───────┬────────────────────────────┬──────────────────────────────┐
/// │ Field │ Valid range (units)        │ Degrees                      │
/// ├───────┼────────────────────────────┼──────────────────────────────┤
/// │ x     │ -1_800_000_000 ..= 1.8e9   │ longitude  -180 ..= 180      │
/// │ y     │   -900_000_000 ..= 9e8     │ latitude    -90 ..= 90       │
/// └───────┴────────────────────────────┴──────────────────────────────┘
/// ```
///
/// The default location is undefined: both coordinates hold
/// [`UNDEFINED_COORDINATE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    /// The undefined location.
    pub const UNDEFINED: Self = Self {
        x: UNDEFINED_COORDINATE,
        y: UNDEFINED_COORDINATE,
    };

    /// Build a location from raw fixed-point coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Build a location from degrees, rounding to the nearest unit.
    ///
    /// Values outside the `i32` range saturate; use
    /// [`is_valid`](Self::is_valid) to reject them.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        let scale = f64::from(COORDINATE_PRECISION);
        Self {
            x: (lon * scale).round() as i32,
            y: (lat * scale).round() as i32,
        }
    }

    #[must_use]
    pub fn x(self) -> i32 {
        self.x
    }

    #[must_use]
    pub fn y(self) -> i32 {
        self.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub fn lon(self) -> f64 {
        f64::from(self.x) / f64::from(COORDINATE_PRECISION)
    }

    /// Latitude in degrees.
    #[must_use]
    pub fn lat(self) -> f64 {
        f64::from(self.y) / f64::from(COORDINATE_PRECISION)
    }

    /// Whether either coordinate has been set.
    #[must_use]
    pub fn is_defined(self) -> bool {
        self.x != UNDEFINED_COORDINATE || self.y != UNDEFINED_COORDINATE
    }

    /// Whether both coordinates lie within the valid longitude and
    /// latitude ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        let max_x = 180 * COORDINATE_PRECISION;
        let max_y = 90 * COORDINATE_PRECISION;
        (-max_x..=max_x).contains(&self.x) && (-max_y..=max_y).contains(&self.y)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_defined() {
            return f.write_str("(undefined,undefined)");
        }
        f.write_str("(")?;
        write_coordinate(f, self.x)?;
        f.write_str(",")?;
        write_coordinate(f, self.y)?;
        f.write_str(")")
    }
}

/// Write a fixed-point coordinate as degrees, without trailing zeros.
///
/// Formatting goes through integers so no floating-point noise ends up
/// in the text.
fn write_coordinate(f: &mut fmt::Formatter<'_>, value: i32) -> fmt::Result {
    let magnitude = i64::from(value).abs();
    let precision = i64::from(COORDINATE_PRECISION);
    if value < 0 {
        f.write_str("-")?;
    }
    write!(f, "{}", magnitude / precision)?;

    let fraction = magnitude % precision;
    if fraction != 0 {
        let digits = format!("{fraction:07}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}

/// An axis-aligned bounding box.
///
/// Bounds start out undefined and grow with [`extend`](Self::extend).
/// Once the first defined location is added, `bottom_left` holds the
/// minimum and `top_right` the maximum of every location seen.
///
/// Bounds do not wrap around the antimeridian.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    bottom_left: Location,
    top_right: Location,
}

impl Bounds {
    /// Bounds spanning the two given corners.
    #[must_use]
    pub fn new(bottom_left: Location, top_right: Location) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    #[must_use]
    pub fn bottom_left(&self) -> Location {
        self.bottom_left
    }

    #[must_use]
    pub fn top_right(&self) -> Location {
        self.top_right
    }

    /// Grow the box so it includes `location`.
    ///
    /// Undefined locations are ignored.
    pub fn extend(&mut self, location: Location) -> &mut Self {
        if !location.is_defined() {
            return self;
        }
        if self.is_defined() {
            self.bottom_left = Location::new(
                self.bottom_left.x.min(location.x),
                self.bottom_left.y.min(location.y),
            );
            self.top_right = Location::new(
                self.top_right.x.max(location.x),
                self.top_right.y.max(location.y),
            );
        } else {
            self.bottom_left = location;
            self.top_right = location;
        }
        self
    }

    /// Grow the box so it includes `other` entirely.
    pub fn extend_bounds(&mut self, other: &Bounds) -> &mut Self {
        self.extend(other.bottom_left).extend(other.top_right)
    }

    /// Whether any location has been added to the box.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.bottom_left.is_defined()
    }

    /// Whether `location` lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        self.is_defined()
            && location.is_defined()
            && (self.bottom_left.x..=self.top_right.x).contains(&location.x)
            && (self.bottom_left.y..=self.top_right.y).contains(&location.y)
    }
}

impl fmt::Display for Bounds {
    /// `(left,bottom,right,top)` in degrees, or `(undefined)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_defined() {
            return f.write_str("(undefined)");
        }
        f.write_str("(")?;
        write_coordinate(f, self.bottom_left.x)?;
        f.write_str(",")?;
        write_coordinate(f, self.bottom_left.y)?;
        f.write_str(",")?;
        write_coordinate(f, self.top_right.x)?;
        f.write_str(",")?;
        write_coordinate(f, self.top_right.y)?;
        f.write_str(")")
    }
}
