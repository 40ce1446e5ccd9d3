use std::fmt;

/// A single extracted cell value. Output cells are `Option<Value>`: `None`
/// is the missing-data sentinel and only becomes the empty string at the
/// serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                // Integer formatting only while the value fits in i64; the
                // cast saturates past that.
                if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
        }
    }

    /// Divides by a unit-normalization factor, e.g. mm³ -> mL.
    pub fn scaled(self, divisor: f64) -> Value {
        Value::Float(self.as_f64() / divisor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Raised when a cell holds text that cannot be read as the expected number.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BadNumber(String);

/// Parses a source-table cell. Empty text is data absence, not an error;
/// anything non-empty must be numeric.
pub fn parse_cell(text: &str) -> Result<Option<Value>, BadNumber> {
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = text.parse::<i64>() {
        return Ok(Some(Value::Integer(parsed)));
    }
    match text.parse::<f64>() {
        Ok(parsed) => Ok(Some(Value::Float(parsed))),
        Err(_) => Err(BadNumber(format!("'{text}' is not numeric"))),
    }
}

/// Parses a voxel count. Integral float text (`"120.0"`) is tolerated
/// because some producers emit counts through a float path; a fractional or
/// negative count is corrupt, not merely absent.
pub fn parse_count(text: &str) -> Result<Option<i64>, BadNumber> {
    if text.is_empty() {
        return Ok(None);
    }
    let parsed = if let Ok(parsed) = text.parse::<i64>() {
        parsed
    } else {
        let parsed: f64 = text
            .parse()
            .map_err(|_| BadNumber(format!("'{text}' is not a valid voxel count")))?;
        if parsed.fract() != 0.0 {
            return Err(BadNumber(format!("voxel count '{text}' is not integral")));
        }
        parsed as i64
    };
    if parsed < 0 {
        return Err(BadNumber(format!("voxel count '{text}' is negative")));
    }
    Ok(Some(parsed))
}
