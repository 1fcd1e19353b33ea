//! The tagged value model (component C5).
//!
//! A [`Value`] is exactly one of an integer, a float, or one of four
//! disjoint address kinds. The address kinds are kept as distinct variants
//! (rather than a single `Address` variant carrying a kind field) so that
//! `match`-based dispatch in the VM can never silently confuse a stack
//! address for a heap address.

use std::fmt;

/// Host-width unsigned address, used for every address space uniformly.
pub type Addr = usize;

/// A runtime value. `None` is a boundary-only pseudo-variant (see
/// [`Value::is_none`]) and is never pushed onto the operand stack.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f64),
    AddressHeap(Addr),
    AddressString(Addr),
    AddressCode(Addr),
    AddressStack(Addr),
    /// External boundary only — "no value". Never appears on the stack.
    #[default]
    None,
}

/// Which [`Value`] variant a value is, independent of its payload. Used by
/// opcode handlers to check a value's kind without matching out the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Integer,
    Float,
    AddressHeap,
    AddressString,
    AddressCode,
    AddressStack,
    None,
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Value::Integer(_) => Tag::Integer,
            Value::Float(_) => Tag::Float,
            Value::AddressHeap(_) => Tag::AddressHeap,
            Value::AddressString(_) => Tag::AddressString,
            Value::AddressCode(_) => Tag::AddressCode,
            Value::AddressStack(_) => Tag::AddressStack,
            Value::None => Tag::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// The address payload of any of the four address variants, or `None`
    /// if this value is not an address at all.
    pub fn as_addr(&self) -> Option<Addr> {
        match *self {
            Value::AddressHeap(a)
            | Value::AddressString(a)
            | Value::AddressCode(a)
            | Value::AddressStack(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Returns a value of the same address kind as `self` but with `addr`
    /// as its payload. Panics if `self` is not an address — callers only
    /// use this after already matching on the tag (see `padd`'s handler).
    pub fn with_addr(&self, addr: Addr) -> Value {
        match self {
            Value::AddressHeap(_) => Value::AddressHeap(addr),
            Value::AddressString(_) => Value::AddressString(addr),
            Value::AddressCode(_) => Value::AddressCode(addr),
            Value::AddressStack(_) => Value::AddressStack(addr),
            other => panic!("with_addr called on non-address value {other:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::AddressHeap(a) => write!(f, "heap#{a:#x}"),
            Value::AddressString(a) => write!(f, "str#{a:#x}"),
            Value::AddressCode(a) => write!(f, "code#{a:#x}"),
            Value::AddressStack(a) => write!(f, "stack#{a:#x}"),
            Value::None => write!(f, "none"),
        }
    }
}

/// Applies a signed displacement to an unsigned address with wrapping
/// arithmetic, as used by `padd` and by negative frame/global offsets.
pub fn displace(base: Addr, offset: i32) -> Addr {
    if offset >= 0 {
        base.wrapping_add(offset as usize)
    } else {
        base.wrapping_sub(offset.unsigned_abs() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_tag_equality_is_false_not_error() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::AddressHeap(4), Value::AddressStack(4));
    }

    #[test]
    fn same_tag_same_payload_is_equal() {
        assert_eq!(Value::AddressHeap(8), Value::AddressHeap(8));
        assert_eq!(Value::Integer(-3), Value::Integer(-3));
    }

    #[test]
    fn displace_wraps_both_directions() {
        assert_eq!(displace(10, 5), 15);
        assert_eq!(displace(10, -5), 5);
        assert_eq!(displace(0, -1), usize::MAX);
    }
}
