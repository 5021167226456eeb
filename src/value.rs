//! Scalar values reported by memcached and their printf-style rendering.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A single statistic value as reported by the server.
///
/// Values are cast opportunistically: anything that looks like a number is
/// stored as one, everything else (versions, paths, ...) stays text.
/// Counters past `i64::MAX` are kept as `UInt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl StatValue {
    /// Numeric view of the value, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(v) => Some(*v as f64),
            StatValue::UInt(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, StatValue::Text(_))
    }

    /// Orders two numeric values. Integers compare exactly, mixed with
    /// floats they compare as `f64`. `None` if either side is text.
    pub fn cmp_numeric(&self, other: &StatValue) -> Option<Ordering> {
        match (self, other) {
            (StatValue::Int(a), StatValue::Int(b)) => Some(a.cmp(b)),
            (StatValue::UInt(a), StatValue::UInt(b)) => Some(a.cmp(b)),
            (StatValue::Int(a), StatValue::UInt(b)) => Some(match u64::try_from(*a) {
                Ok(a) => a.cmp(b),
                Err(_) => Ordering::Less,
            }),
            (StatValue::UInt(_), StatValue::Int(_)) => other.cmp_numeric(self).map(Ordering::reverse),
            _ => Some(self.as_f64()?.total_cmp(&other.as_f64()?)),
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(v) => write!(f, "{v}"),
            StatValue::UInt(v) => write!(f, "{v}"),
            StatValue::Float(v) => write!(f, "{v}"),
            StatValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int(v)
    }
}

impl From<u64> for StatValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(StatValue::UInt(v), StatValue::Int)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

/// Casts raw text to a float (when it contains a dot) or an integer.
/// Integers that overflow `i64` but fit `u64` become `UInt`.
/// Text that parses as neither is returned unchanged.
pub fn cast(raw: &str) -> StatValue {
    if raw.contains('.') {
        raw.parse::<f64>()
            .map(StatValue::Float)
            .unwrap_or_else(|_| StatValue::Text(raw.to_string()))
    } else {
        raw.parse::<i64>()
            .map(StatValue::Int)
            .or_else(|_| raw.parse::<u64>().map(StatValue::UInt))
            .unwrap_or_else(|_| StatValue::Text(raw.to_string()))
    }
}

/// Parsed `%[flags][width][.precision]conv` directive.
#[derive(Debug, Default)]
struct Directive {
    left: bool,
    zero: bool,
    plus: bool,
    width: usize,
    precision: Option<usize>,
}

/// Renders `value` through a printf-style template such as `%u`, `%.2f` or
/// `%s`, as used by gmond metric descriptors.
///
/// Numeric conversions applied to text values fall back to the raw text so a
/// mistyped descriptor never hides the value.
pub fn format_value(template: &str, value: &StatValue) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '0' => directive.zero = true,
                '+' => directive.plus = true,
                ' ' | '#' => {}
                _ => break,
            }
            chars.next();
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            directive.width = directive.width * 10 + d as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                chars.next();
            }
            directive.precision = Some(precision);
        }
        // Length modifiers carry no meaning here.
        while matches!(chars.peek(), Some('l' | 'h' | 'q' | 'z')) {
            chars.next();
        }

        let body = match chars.next() {
            Some('%') => {
                out.push('%');
                continue;
            }
            Some('d' | 'i' | 'u') => match value {
                StatValue::Int(v) => sign(*v as f64, &directive, v.to_string()),
                StatValue::UInt(v) => sign(0.0, &directive, v.to_string()),
                StatValue::Float(v) => sign(*v, &directive, format!("{}", v.trunc() as i64)),
                StatValue::Text(t) => t.clone(),
            },
            Some('f' | 'F') => match value.as_f64() {
                Some(v) => sign(v, &directive, format!("{:.*}", directive.precision.unwrap_or(6), v)),
                None => value.to_string(),
            },
            Some('e' | 'E') => match value.as_f64() {
                Some(v) => sign(v, &directive, format!("{:.*e}", directive.precision.unwrap_or(6), v)),
                None => value.to_string(),
            },
            Some('g' | 'G') => match value.as_f64() {
                Some(v) => sign(v, &directive, format!("{v}")),
                None => value.to_string(),
            },
            Some('x') => match value {
                StatValue::Int(v) => format!("{v:x}"),
                StatValue::UInt(v) => format!("{v:x}"),
                _ => value.to_string(),
            },
            Some('s') | Some('r') => {
                let text = value.to_string();
                match directive.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
            Some(other) => {
                // Unknown conversion, emit it verbatim.
                out.push('%');
                out.push(other);
                continue;
            }
            None => {
                out.push('%');
                break;
            }
        };

        pad(&mut out, &body, &directive, value.is_numeric());
    }

    out
}

fn sign(v: f64, directive: &Directive, body: String) -> String {
    if directive.plus && v >= 0.0 {
        format!("+{body}")
    } else {
        body
    }
}

fn pad(out: &mut String, body: &str, directive: &Directive, numeric: bool) {
    let len = body.chars().count();
    if len >= directive.width {
        out.push_str(body);
        return;
    }
    let fill = directive.width - len;
    if directive.left {
        out.push_str(body);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if directive.zero && numeric {
        let (sign, digits) = match body.strip_prefix(['-', '+']) {
            Some(rest) => (&body[..1], rest),
            None => ("", body),
        };
        out.push_str(sign);
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(body);
    }
}
