//! The constant pool.
//!
//! An append-only sequence of literal values paired with a dedup map.
//! Scalars dedup by structural equality (numbers by bit pattern); objects
//! are always given a fresh index.

use rustc_hash::FxHashMap;

/// A value embedded in the output container's data section.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    /// IEEE-754 double
    Number(f64),
    /// UTF-8 string
    Str(String),
    /// Boolean
    Bool(bool),
    /// null
    Null,
    /// undefined
    Undefined,
    /// Signed 64-bit integer
    BigInt(i64),
    /// Opaque object, serialized canonically (sorted keys)
    Object(serde_json::Value),
}

/// Dedup key for scalar constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Number(u64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    BigInt(i64),
}

impl ConstKey {
    fn of(value: &Const) -> Option<ConstKey> {
        match value {
            Const::Number(n) => Some(ConstKey::Number(n.to_bits())),
            Const::Str(s) => Some(ConstKey::Str(s.clone())),
            Const::Bool(b) => Some(ConstKey::Bool(*b)),
            Const::Null => Some(ConstKey::Null),
            Const::Undefined => Some(ConstKey::Undefined),
            Const::BigInt(i) => Some(ConstKey::BigInt(*i)),
            Const::Object(_) => None,
        }
    }
}

/// Ordered, deduplicated pool of constants.
#[derive(Debug, Default)]
pub struct ConstantPool {
    values: Vec<Const>,
    index: FxHashMap<ConstKey, u32>,
}

impl ConstantPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value and returns its index. Equal scalars map to the same
    /// index; objects always append.
    pub fn add(&mut self, value: Const) -> u32 {
        if let Some(key) = ConstKey::of(&value) {
            if let Some(&existing) = self.index.get(&key) {
                return existing;
            }
            let idx = self.values.len() as u32;
            self.values.push(value);
            self.index.insert(key, idx);
            idx
        } else {
            let idx = self.values.len() as u32;
            self.values.push(value);
            idx
        }
    }

    /// Shorthand for interning a string (used for names and keys).
    pub fn add_str(&mut self, s: &str) -> u32 {
        self.add(Const::Str(s.to_string()))
    }

    /// Number of constants in the pool.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the pool, yielding the ordered values.
    pub fn into_values(self) -> Vec<Const> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_dedup() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add(Const::Number(1.0)), 0);
        assert_eq!(pool.add(Const::Str("x".into())), 1);
        assert_eq!(pool.add(Const::Number(1.0)), 0);
        assert_eq!(pool.add(Const::Str("x".into())), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_number_dedup_is_bitwise() {
        let mut pool = ConstantPool::new();
        let zero = pool.add(Const::Number(0.0));
        let neg_zero = pool.add(Const::Number(-0.0));
        assert_ne!(zero, neg_zero);
    }

    #[test]
    fn test_null_and_undefined_distinct() {
        let mut pool = ConstantPool::new();
        let null = pool.add(Const::Null);
        let undef = pool.add(Const::Undefined);
        assert_ne!(null, undef);
        assert_eq!(pool.add(Const::Null), null);
    }

    #[test]
    fn test_objects_never_dedup() {
        let mut pool = ConstantPool::new();
        let obj = serde_json::json!({"type": "start"});
        let a = pool.add(Const::Object(obj.clone()));
        let b = pool.add(Const::Object(obj));
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_bigint_and_number_distinct() {
        let mut pool = ConstantPool::new();
        let n = pool.add(Const::Number(7.0));
        let b = pool.add(Const::BigInt(7));
        assert_ne!(n, b);
    }
}
