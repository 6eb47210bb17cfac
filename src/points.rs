//! Point registry, the fixed-capacity arena of sampled and driven I/O.
//!
//! Every input or output the node exposes is a [`Point`].  Points are
//! created once at start-up from a table of [`PointSpec`]s and are never
//! removed, so a [`PointId`] stays valid for the life of the process.
//! Bus devices refer back to their owning point by id, never by pointer.
//!
//! ```text
//!   PointTable ─┬─ [0] din  pin 26   Int(1)
//!               ├─ [1] ain  pin 32   Int(512)
//!               ├─ [2] ow   line 4   Float(21.5)  ◀── BusDevice.owner
//!               └─ [3] dout pin 12   Int(0)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of points a node can carry.
pub const MAX_POINTS: usize = 32;

/// Maximum label length (bytes).
pub const LABEL_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Identity and kind
// ---------------------------------------------------------------------------

/// Stable index of a point within its [`PointTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(u8);

impl PointId {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// What a point is wired to.  Serialised with the short flavour names used
/// in node configuration payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    #[serde(rename = "din")]
    DigitalInput,
    #[serde(rename = "ain")]
    AnalogInput,
    #[serde(rename = "dout")]
    DigitalOutput,
    #[serde(rename = "pwmout")]
    PwmOutput,
    /// A sensor on a multi-drop bus line; `pin` is the line number.
    #[serde(rename = "ow")]
    BusSensor,
}

impl PointKind {
    /// Inputs sampled directly from GPIO every tick.
    pub fn is_gpio_input(self) -> bool {
        matches!(self, Self::DigitalInput | Self::AnalogInput)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Self::DigitalOutput | Self::PwmOutput)
    }

    /// Short flavour name, e.g. `"din"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DigitalInput => "din",
            Self::AnalogInput => "ain",
            Self::DigitalOutput => "dout",
            Self::PwmOutput => "pwmout",
            Self::BusSensor => "ow",
        }
    }

    /// The zero value of the reading type this kind produces.
    fn zero(self) -> Reading {
        match self {
            Self::BusSensor => Reading::Float(0.0),
            _ => Reading::Int(0),
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A sampled value: raw integer for GPIO, floating point for bus sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    Int(u16),
    Float(f32),
}

impl Reading {
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Int(v) => v as f32,
            Self::Float(v) => v,
        }
    }

    /// Absolute difference between two readings.  Integer pairs are
    /// compared exactly; anything involving a float goes through `f32`.
    pub fn delta(self, other: Self) -> f32 {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.abs_diff(b) as f32,
            (a, b) => (a.as_f32() - b.as_f32()).abs(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.2}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// Start-up description of one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSpec {
    pub kind: PointKind,
    /// GPIO pin number, or bus line for [`PointKind::BusSensor`].
    pub pin: u8,
    pub label: heapless::String<LABEL_LEN>,
}

impl PointSpec {
    /// Convenience constructor; labels longer than [`LABEL_LEN`] are cut.
    pub fn new(kind: PointKind, pin: u8, label: &str) -> Self {
        let mut l = heapless::String::new();
        for c in label.chars() {
            if l.push(c).is_err() {
                break;
            }
        }
        Self { kind, pin, label: l }
    }
}

/// One sampled input or controlled output.
#[derive(Debug, Clone)]
pub struct Point {
    id: PointId,
    kind: PointKind,
    pin: u8,
    label: heapless::String<LABEL_LEN>,
    /// Last value read from hardware (or commanded, for outputs).
    pub raw_value: Reading,
    /// Last value handed to the emitter.
    pub last_published_value: Reading,
    /// Consecutive samples that differed from `last_published_value`.
    pub pending_count: u8,
    /// Cleared when a bus point loses its device.
    pub valid: bool,
}

impl Point {
    fn from_spec(id: PointId, spec: &PointSpec) -> Self {
        let zero = spec.kind.zero();
        Self {
            id,
            kind: spec.kind,
            pin: spec.pin,
            label: spec.label.clone(),
            raw_value: zero,
            last_published_value: zero,
            pending_count: 0,
            // Bus points have nothing to report until their first conversion.
            valid: spec.kind != PointKind::BusSensor,
        }
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Record a successful publish of `raw_value`.
    pub(crate) fn mark_published(&mut self) {
        self.last_published_value = self.raw_value;
        self.pending_count = 0;
    }
}

// ---------------------------------------------------------------------------
// PointTable
// ---------------------------------------------------------------------------

/// Errors from point lookups and output commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointError {
    /// No point with that id.
    Unknown(PointId),
    /// More specs than [`MAX_POINTS`].
    TableFull,
    /// The point cannot be driven.
    NotAnOutput(PointId),
    /// Commanded value is outside the output's range.
    ValueOutOfRange(PointId),
}

impl fmt::Display for PointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown point {id}"),
            Self::TableFull => write!(f, "point table full ({MAX_POINTS})"),
            Self::NotAnOutput(id) => write!(f, "point {id} is not an output"),
            Self::ValueOutOfRange(id) => write!(f, "value out of range for {id}"),
        }
    }
}

/// Fixed-capacity arena of points, indexed by [`PointId`].
#[derive(Debug, Default)]
pub struct PointTable {
    points: heapless::Vec<Point, MAX_POINTS>,
}

impl PointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from start-up specs, in order.
    pub fn from_specs(specs: &[PointSpec]) -> Result<Self, PointError> {
        let mut table = Self::new();
        for spec in specs {
            table.add(spec)?;
        }
        Ok(table)
    }

    /// Append a point.  Ids are handed out sequentially and never reused.
    pub fn add(&mut self, spec: &PointSpec) -> Result<PointId, PointError> {
        let id = PointId::new(self.points.len() as u8);
        self.points
            .push(Point::from_spec(id, spec))
            .map_err(|_| PointError::TableFull)?;
        Ok(id)
    }

    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.index())
    }

    pub fn get_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Point> {
        self.points.iter_mut()
    }

    /// First bus point at or after index `from`.
    pub(crate) fn next_bus_point(&self, from: usize) -> Option<PointId> {
        self.points
            .iter()
            .skip(from)
            .find(|p| p.kind == PointKind::BusSensor)
            .map(Point::id)
    }
}
