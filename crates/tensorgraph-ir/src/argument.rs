//! Concrete tensor values.
//!
//! An [`Argument`] pairs a [`Shape`] with an owned byte buffer (or, for
//! tuple-shaped values, an ordered list of component arguments). Arguments
//! are immutable once constructed; kernels and helpers always produce new
//! values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::shape::{ElementType, Shape, TensorShape};

/// A typed scalar constant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
    U8(u8),
    Bool(bool),
}

impl Scalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalar::F32(_) => ElementType::Float,
            Scalar::F64(_) => ElementType::Double,
            Scalar::I32(_) => ElementType::Int32,
            Scalar::I64(_) => ElementType::Int64,
            Scalar::U8(_) => ElementType::Uint8,
            Scalar::Bool(_) => ElementType::Bool,
        }
    }

    /// Nonzero test, used to resolve branch conditions.
    pub fn is_truthy(&self) -> bool {
        match *self {
            Scalar::F32(v) => v != 0.0,
            Scalar::F64(v) => v != 0.0,
            Scalar::I32(v) => v != 0,
            Scalar::I64(v) => v != 0,
            Scalar::U8(v) => v != 0,
            Scalar::Bool(v) => v,
        }
    }

    fn write(&self, buf: &mut [u8], slot: usize) {
        match *self {
            Scalar::F32(v) => write_slot(buf, slot, &v.to_le_bytes()),
            Scalar::F64(v) => write_slot(buf, slot, &v.to_le_bytes()),
            Scalar::I32(v) => write_slot(buf, slot, &v.to_le_bytes()),
            Scalar::I64(v) => write_slot(buf, slot, &v.to_le_bytes()),
            Scalar::U8(v) => write_slot(buf, slot, &[v]),
            Scalar::Bool(v) => write_slot(buf, slot, &[v as u8]),
        }
    }

    fn read(ty: ElementType, buf: &[u8], slot: usize) -> Scalar {
        let size = ty.size();
        let at = slot * size;
        let raw = &buf[at..at + size];
        match ty {
            ElementType::Float => Scalar::F32(f32::from_le_bytes(raw.try_into().unwrap())),
            ElementType::Double => Scalar::F64(f64::from_le_bytes(raw.try_into().unwrap())),
            ElementType::Int32 => Scalar::I32(i32::from_le_bytes(raw.try_into().unwrap())),
            ElementType::Int64 => Scalar::I64(i64::from_le_bytes(raw.try_into().unwrap())),
            ElementType::Uint8 => Scalar::U8(raw[0]),
            ElementType::Bool => Scalar::Bool(raw[0] != 0),
        }
    }
}

fn write_slot(buf: &mut [u8], slot: usize, bytes: &[u8]) {
    let at = slot * bytes.len();
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Rust element types that can view a tensor buffer directly.
pub trait Element: bytemuck::Pod {
    const ELEMENT_TYPE: ElementType;

    fn to_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($ty:ty, $et:expr, $sc:path) => {
        impl Element for $ty {
            const ELEMENT_TYPE: ElementType = $et;

            fn to_scalar(self) -> Scalar {
                $sc(self)
            }
        }
    };
}

impl_element!(f32, ElementType::Float, Scalar::F32);
impl_element!(f64, ElementType::Double, Scalar::F64);
impl_element!(i32, ElementType::Int32, Scalar::I32);
impl_element!(i64, ElementType::Int64, Scalar::I64);
impl_element!(u8, ElementType::Uint8, Scalar::U8);

/// Nested-list representation of a tensor value, mirroring the shape's
/// dimension lengths. Used for construction, comparison and printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Nested {
    Value(Scalar),
    List(Vec<Nested>),
}

impl Nested {
    pub fn list(items: Vec<Nested>) -> Self {
        Nested::List(items)
    }

    pub fn value(scalar: Scalar) -> Self {
        Nested::Value(scalar)
    }
}

impl fmt::Display for Nested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nested::Value(s) => s.fmt(f),
            Nested::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Payload {
    Data(Vec<u8>),
    Tuple(Vec<Argument>),
}

/// A concrete tensor value: a shape plus its backing data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    shape: Shape,
    payload: Payload,
}

impl Argument {
    /// Wrap a raw buffer. The buffer length must match the shape's byte size.
    pub fn from_bytes(shape: Shape, data: Vec<u8>) -> Result<Self, IrError> {
        let tensor = shape.expect_tensor()?;
        if data.len() != tensor.bytes() {
            return Err(IrError::ShapeMismatch {
                expected: format!("{} bytes for {}", tensor.bytes(), tensor),
                actual: format!("{} bytes", data.len()),
            });
        }
        Ok(Argument {
            shape,
            payload: Payload::Data(data),
        })
    }

    /// Build a tensor argument from typed values, one per buffer slot.
    pub fn from_slice<T: Element>(shape: Shape, values: &[T]) -> Result<Self, IrError> {
        let tensor = shape.expect_tensor()?;
        if tensor.element_type() != T::ELEMENT_TYPE {
            return Err(IrError::ShapeMismatch {
                expected: tensor.element_type().to_string(),
                actual: T::ELEMENT_TYPE.to_string(),
            });
        }
        if values.len() != tensor.element_space() {
            return Err(IrError::ShapeMismatch {
                expected: format!("{} values for {}", tensor.element_space(), tensor),
                actual: format!("{} values", values.len()),
            });
        }
        let data = bytemuck::cast_slice(values).to_vec();
        Ok(Argument {
            shape,
            payload: Payload::Data(data),
        })
    }

    /// Aggregate arguments into a tuple value.
    pub fn tuple(fields: Vec<Argument>) -> Self {
        let shape = Shape::tuple(fields.iter().map(|a| a.shape.clone()).collect());
        Argument {
            shape,
            payload: Payload::Tuple(fields),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.payload, Payload::Tuple(_))
    }

    /// Component arguments of a tuple value.
    pub fn fields(&self) -> Option<&[Argument]> {
        match &self.payload {
            Payload::Tuple(fields) => Some(fields),
            Payload::Data(_) => None,
        }
    }

    pub fn expect_fields(&self) -> Result<&[Argument], IrError> {
        self.fields().ok_or_else(|| IrError::NotATuple {
            found: self.shape.to_string(),
        })
    }

    /// Raw backing bytes of a tensor value.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Data(data) => Some(data),
            Payload::Tuple(_) => None,
        }
    }

    /// Typed view over the buffer slots of a tensor value. Fails when the
    /// buffer is not aligned for `T`.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], IrError> {
        let tensor = self.shape.expect_tensor()?;
        if tensor.element_type() != T::ELEMENT_TYPE {
            return Err(IrError::ShapeMismatch {
                expected: tensor.element_type().to_string(),
                actual: T::ELEMENT_TYPE.to_string(),
            });
        }
        match &self.payload {
            Payload::Data(data) => {
                bytemuck::try_cast_slice(data).map_err(|_| IrError::InvalidShape {
                    reason: "buffer is not aligned for a typed view".into(),
                })
            }
            Payload::Tuple(_) => unreachable!("tensor shape with tuple payload"),
        }
    }

    /// Scalar at a logical (row-major) element index, resolved through the
    /// shape's strides.
    pub fn scalar_at(&self, linear: usize) -> Result<Scalar, IrError> {
        let tensor = self.shape.expect_tensor()?;
        let data = self.data().expect("tensor payload");
        Ok(Scalar::read(
            tensor.element_type(),
            data,
            tensor.linear_offset(linear),
        ))
    }

    /// Logical (row-major) element read-out. Broadcast dimensions repeat the
    /// underlying element.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, IrError> {
        let tensor = self.shape.expect_tensor()?;
        if tensor.element_type() != T::ELEMENT_TYPE {
            return Err(IrError::ShapeMismatch {
                expected: tensor.element_type().to_string(),
                actual: T::ELEMENT_TYPE.to_string(),
            });
        }
        let data = self.data().expect("tensor payload");
        let size = tensor.element_type().size();
        let mut out = Vec::with_capacity(tensor.elements());
        for linear in 0..tensor.elements() {
            let at = tensor.linear_offset(linear) * size;
            out.push(bytemuck::pod_read_unaligned(&data[at..at + size]));
        }
        Ok(out)
    }

    /// Nested-list representation mirroring the shape's dimension lengths.
    pub fn to_nested(&self) -> Result<Nested, IrError> {
        let tensor = self.shape.expect_tensor()?;
        let data = self.data().expect("tensor payload");
        Ok(build_nested(tensor, data, &mut vec![0; tensor.rank()], 0))
    }

    /// Build an argument from a nested-list value, checking the structure
    /// against the shape dimension by dimension.
    pub fn from_nested(nested: &Nested, shape: &Shape) -> Result<Self, IrError> {
        let tensor = shape.expect_tensor()?;
        let mut data = vec![0u8; tensor.bytes()];
        fill_from_nested(nested, tensor, &mut data, &mut vec![0; tensor.rank()], 0)?;
        Argument::from_bytes(shape.clone(), data)
    }
}

fn build_nested(shape: &TensorShape, data: &[u8], coords: &mut Vec<usize>, dim: usize) -> Nested {
    if dim == shape.rank() {
        return Nested::Value(Scalar::read(
            shape.element_type(),
            data,
            shape.index_of(coords),
        ));
    }
    let mut items = Vec::with_capacity(shape.lens()[dim]);
    for i in 0..shape.lens()[dim] {
        coords[dim] = i;
        items.push(build_nested(shape, data, coords, dim + 1));
    }
    Nested::List(items)
}

fn fill_from_nested(
    nested: &Nested,
    shape: &TensorShape,
    data: &mut [u8],
    coords: &mut Vec<usize>,
    dim: usize,
) -> Result<(), IrError> {
    if dim == shape.rank() {
        let Nested::Value(scalar) = nested else {
            return Err(IrError::ShapeMismatch {
                expected: format!("scalar at depth {}", dim),
                actual: "list".into(),
            });
        };
        if scalar.element_type() != shape.element_type() {
            return Err(IrError::ShapeMismatch {
                expected: shape.element_type().to_string(),
                actual: scalar.element_type().to_string(),
            });
        }
        scalar.write(data, shape.index_of(coords));
        return Ok(());
    }
    let Nested::List(items) = nested else {
        return Err(IrError::ShapeMismatch {
            expected: format!("list of {} at depth {}", shape.lens()[dim], dim),
            actual: "scalar".into(),
        });
    };
    if items.len() != shape.lens()[dim] {
        return Err(IrError::ShapeMismatch {
            expected: format!("{} items at depth {}", shape.lens()[dim], dim),
            actual: format!("{} items", items.len()),
        });
    }
    for (i, item) in items.iter().enumerate() {
        coords[dim] = i;
        fill_from_nested(item, shape, data, coords, dim + 1)?;
    }
    Ok(())
}

/// Deterministic linear congruential generator for reproducible fixtures.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        SeededRng {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_scalar(&mut self, ty: ElementType) -> Scalar {
        match ty {
            ElementType::Float => Scalar::F32((self.next_f64() * 2.0 - 1.0) as f32),
            ElementType::Double => Scalar::F64(self.next_f64() * 2.0 - 1.0),
            ElementType::Int32 => Scalar::I32((self.next_u64() % 201) as i32 - 100),
            ElementType::Int64 => Scalar::I64((self.next_u64() % 201) as i64 - 100),
            ElementType::Uint8 => Scalar::U8((self.next_u64() % 256) as u8),
            ElementType::Bool => Scalar::Bool(self.next_u64() % 2 == 1),
        }
    }
}

/// Deterministic pseudo-random argument for test fixtures. Identical shape
/// and seed always produce identical bytes.
pub fn generate_argument(shape: &Shape, seed: u64) -> Argument {
    let mut rng = SeededRng::new(seed);
    generate_with(shape, &mut rng)
}

fn generate_with(shape: &Shape, rng: &mut SeededRng) -> Argument {
    match shape {
        Shape::Tensor(tensor) => {
            let mut data = vec![0u8; tensor.bytes()];
            for slot in 0..tensor.element_space() {
                rng.next_scalar(tensor.element_type()).write(&mut data, slot);
            }
            Argument {
                shape: shape.clone(),
                payload: Payload::Data(data),
            }
        }
        Shape::Tuple(components) => {
            Argument::tuple(components.iter().map(|c| generate_with(c, rng)).collect())
        }
    }
}

/// Broadcast-fill every addressable slot with the scalar. The scalar's type
/// must match the shape's element type.
pub fn fill_argument(shape: &Shape, scalar: Scalar) -> Result<Argument, IrError> {
    let tensor = shape.expect_tensor()?;
    if scalar.element_type() != tensor.element_type() {
        return Err(IrError::ShapeMismatch {
            expected: tensor.element_type().to_string(),
            actual: scalar.element_type().to_string(),
        });
    }
    let mut data = vec![0u8; tensor.bytes()];
    for slot in 0..tensor.element_space() {
        scalar.write(&mut data, slot);
    }
    Argument::from_bytes(shape.clone(), data)
}
