//! Runtime values of the beauty language.

pub mod store;

use std::fmt;

use beauty_parser::types::Type;

/// Significant digits used when printing numbers.
const PRECISION: usize = 6;

/// A self-contained runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Array),
}

/// An array payload. Arrays are copied on declaration, assignment, argument passing and return.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    /// [`Type::None`] until an empty list literal is coerced to a concrete array.
    pub element: Type,
    pub items: Vec<Rvalue>,
}

impl Rvalue {
    pub fn ty(&self) -> Type {
        match self {
            Rvalue::Boolean(_) => Type::Boolean,
            Rvalue::Number(_) => Type::Number,
            Rvalue::String(_) => Type::String,
            Rvalue::Array(array) => Type::array_of(array.element.clone()),
        }
    }

    /// The value of a variable of type `ty` declared without initializer.
    pub fn default_for(ty: &Type) -> Option<Rvalue> {
        match ty {
            Type::Boolean => Some(Rvalue::Boolean(false)),
            Type::Number => Some(Rvalue::Number(0.0)),
            Type::String => Some(Rvalue::String(String::new())),
            Type::Array(element) if element.is_concrete() => Some(Rvalue::Array(Array {
                element: element.as_ref().clone(),
                items: Vec::new(),
            })),
            _ => None,
        }
    }

    /// Builds the value of a list literal from its evaluated elements.
    /// The element type is the common type of the elements, [`Type::None`] for `[]`.
    pub fn list(items: Vec<Rvalue>) -> Rvalue {
        let common = items
            .iter()
            .try_fold(Type::None, |common, item| Type::merge(&common, &item.ty()));
        if let Some(element) = common {
            let retagged: Option<Vec<Rvalue>> = items
                .iter()
                .map(|item| item.clone().coerce(&element))
                .collect();
            if let Some(items) = retagged {
                return Rvalue::Array(Array { element, items });
            }
        }
        // mixed elements, rejected by the analyzer
        let element = items.first().map(Rvalue::ty).unwrap_or(Type::None);
        Rvalue::Array(Array { element, items })
    }

    /// Converts the value into one of type `target`, retagging nested arrays.
    /// Returns `None` if the value does not fit.
    pub fn coerce(self, target: &Type) -> Option<Rvalue> {
        match (self, target) {
            (Rvalue::Array(array), Type::Array(element)) => {
                if array.element != Type::None && Type::merge(&array.element, element).is_none() {
                    return None;
                }
                let items = array
                    .items
                    .into_iter()
                    .map(|item| item.coerce(element))
                    .collect::<Option<Vec<_>>>()?;
                Some(Rvalue::Array(Array {
                    element: element.as_ref().clone(),
                    items,
                }))
            }
            (value, target) if value.ty() == *target => Some(value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Rvalue::Boolean(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Rvalue::Number(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Rvalue::String(val) => Some(val),
            _ => None,
        }
    }
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Boolean(val) => write!(f, "{}", val),
            Rvalue::Number(val) => write!(f, "{}", format_number(*val)),
            Rvalue::String(val) => write!(f, "{}", val),
            Rvalue::Array(array) => {
                write!(f, "[")?;
                for (i, item) in array.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Formats a number like C's `%g`: six significant digits, trailing zeros removed and
/// scientific notation for very small or very large magnitudes.
pub fn format_number(val: f64) -> String {
    if val.is_nan() {
        return "nan".to_string();
    } else if val.is_infinite() {
        return if val > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // rounding may carry into the next power of ten, so take the exponent after rounding
    let scientific = format!("{:.*e}", PRECISION - 1, val);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exponent) as usize;
        trim_zeros(&format!("{:.*}", decimals, val)).to_string()
    }
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// An addressable storage slot: a variable pinned to the scope level it resolved in, plus a
/// path of indices into nested array elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lvalue {
    pub level: usize,
    pub name: String,
    pub path: Vec<usize>,
}

impl Lvalue {
    /// Addresses element `index` of the array stored in this slot.
    pub fn index(mut self, index: usize) -> Lvalue {
        self.path.push(index);
        self
    }
}
