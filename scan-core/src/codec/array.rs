use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde_json::{Map, Number, Value};

use super::{ARRAY_DATA, ARRAY_MARKER};
use crate::error::CodecError;

type Result<T> = std::result::Result<T, CodecError>;

/// Decoded n-dimensional array, typed by its element kind
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
}

impl NumericArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            NumericArray::Float(a) => a.shape(),
            NumericArray::Int(a) => a.shape(),
        }
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match self {
            NumericArray::Float(a) => Some(a),
            NumericArray::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&ArrayD<i64>> {
        match self {
            NumericArray::Int(a) => Some(a),
            NumericArray::Float(_) => None,
        }
    }

    /// Element values widened to f64, in row-major order
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NumericArray::Float(a) => a.iter().copied().collect(),
            NumericArray::Int(a) => a.iter().map(|&v| v as f64).collect(),
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            NumericArray::Float(a) => encode_float(a),
            NumericArray::Int(a) => encode_int(a),
        }
    }
}

/// Result of decoding one value: either a tagged array, or the input as-is
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Array(NumericArray),
    Value(Value),
}

/// Document tree with every tagged array replaced by its decoded form
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedTree {
    Array(NumericArray),
    Object(Vec<(String, DecodedTree)>),
    List(Vec<DecodedTree>),
    Scalar(Value),
}

impl DecodedTree {
    /// Look up a key on an object node
    pub fn get(&self, key: &str) -> Option<&DecodedTree> {
        match self {
            DecodedTree::Object(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NumericArray> {
        match self {
            DecodedTree::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DecodedTree]> {
        match self {
            DecodedTree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            DecodedTree::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

/// Encode a float array as a tagged value
pub fn encode_float(array: &ArrayD<f64>) -> Value {
    tag(nest(array.view(), |&v| {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }))
}

/// Encode an integer array as a tagged value
pub fn encode_int(array: &ArrayD<i64>) -> Value {
    tag(nest(array.view(), |&v| Value::Number(Number::from(v))))
}

fn tag(data: Value) -> Value {
    let mut map = Map::new();
    map.insert(ARRAY_MARKER.to_string(), Value::Bool(true));
    map.insert(ARRAY_DATA.to_string(), data);
    Value::Object(map)
}

fn nest<T>(array: ArrayViewD<'_, T>, leaf: impl Fn(&T) -> Value + Copy) -> Value {
    if array.ndim() == 0 {
        return array.iter().next().map(leaf).unwrap_or(Value::Null);
    }
    Value::Array(array.outer_iter().map(|sub| nest(sub, leaf)).collect())
}

/// Decode a single value. Values without the sentinel pass through.
pub fn decode(value: Value) -> Result<Decoded> {
    match value {
        Value::Object(mut map) if map.contains_key(ARRAY_MARKER) => {
            let data = map.remove(ARRAY_DATA).ok_or(CodecError::MissingData)?;
            decode_data(&data).map(Decoded::Array)
        }
        other => Ok(Decoded::Value(other)),
    }
}

/// Decode every tagged array in a document, innermost first
pub fn decode_tree(value: Value) -> Result<DecodedTree> {
    match value {
        Value::Object(mut map) if map.contains_key(ARRAY_MARKER) => {
            let data = map.remove(ARRAY_DATA).ok_or(CodecError::MissingData)?;
            decode_data(&data).map(DecodedTree::Array)
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| decode_tree(v).map(|d| (k, d)))
            .collect::<Result<Vec<_>>>()
            .map(DecodedTree::Object),
        Value::Array(items) => items
            .into_iter()
            .map(decode_tree)
            .collect::<Result<Vec<_>>>()
            .map(DecodedTree::List),
        other => Ok(DecodedTree::Scalar(other)),
    }
}

fn decode_data(data: &Value) -> Result<NumericArray> {
    let shape = infer_shape(data);
    let mut leaves = Vec::new();
    flatten(data, &shape, 0, &mut leaves)?;

    let all_int = leaves.iter().all(|n| n.is_i64());
    let array = if all_int && !leaves.is_empty() {
        let values: Vec<i64> = leaves.iter().filter_map(Number::as_i64).collect();
        NumericArray::Int(
            ArrayD::from_shape_vec(IxDyn(&shape), values)
                .map_err(|e| CodecError::Shape(e.to_string()))?,
        )
    } else {
        let values = leaves
            .iter()
            .map(|n| {
                n.as_f64()
                    .ok_or_else(|| CodecError::NonNumeric(n.to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;
        NumericArray::Float(
            ArrayD::from_shape_vec(IxDyn(&shape), values)
                .map_err(|e| CodecError::Shape(e.to_string()))?,
        )
    };
    Ok(array)
}

fn infer_shape(data: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut cursor = data;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }
    shape
}

fn flatten(data: &Value, shape: &[usize], depth: usize, out: &mut Vec<Number>) -> Result<()> {
    if depth == shape.len() {
        return match data {
            Value::Number(n) => {
                out.push(n.clone());
                Ok(())
            }
            Value::Array(_) => Err(CodecError::Ragged(depth)),
            other => Err(CodecError::NonNumeric(other.to_string())),
        };
    }

    match data {
        Value::Array(items) if items.len() == shape[depth] => items
            .iter()
            .try_for_each(|item| flatten(item, shape, depth + 1, out)),
        _ => Err(CodecError::Ragged(depth)),
    }
}
