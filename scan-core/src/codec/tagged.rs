//! Serde adapters that write nalgebra values in the tagged array form.
//!
//! Use with `#[serde(with = "...")]`. The data layout is fixed per adapter,
//! so the same adapters work for self-describing text formats and for
//! binary formats that cannot infer nesting depth.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize)]
struct TaggedRef<'a, T: ?Sized> {
    #[serde(rename = "__nparray__")]
    marker: bool,
    #[serde(rename = "__npdata__")]
    data: &'a T,
}

#[derive(Deserialize)]
struct Tagged<T> {
    #[serde(rename = "__nparray__")]
    marker: bool,
    #[serde(rename = "__npdata__")]
    data: T,
}

fn write<S: Serializer, T: Serialize + ?Sized>(data: &T, serializer: S) -> Result<S::Ok, S::Error> {
    TaggedRef { marker: true, data }.serialize(serializer)
}

fn read<'de, D: Deserializer<'de>, T: Deserialize<'de>>(deserializer: D) -> Result<T, D::Error> {
    let tagged = Tagged::<T>::deserialize(deserializer)?;
    if !tagged.marker {
        return Err(D::Error::custom("array marker is false"));
    }
    Ok(tagged.data)
}

/// `Matrix3<f64>` as nested row lists
pub mod matrix3 {
    use nalgebra::Matrix3;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(m: &Matrix3<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: [[f64; 3]; 3] = std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]));
        super::write(&rows, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Matrix3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: [[f64; 3]; 3] = super::read(deserializer)?;
        Ok(Matrix3::from_fn(|r, c| rows[r][c]))
    }
}

/// `Vector3<f64>` as a flat list
pub mod vector3 {
    use nalgebra::Vector3;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        super::write(&[v.x, v.y, v.z], serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data: [f64; 3] = super::read(deserializer)?;
        Ok(Vector3::from(data))
    }
}

/// `Vec<f64>` of any length
pub mod vector {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        super::write(v, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        super::read(deserializer)
    }
}
