//! Tensor shape descriptors.
//!
//! A [`Shape`] is either a single tensor shape (element type, dimension
//! lengths, strides) or a tuple of component shapes. Tuple shapes describe
//! multi-output instructions and are destructured with the `get_tuple_elem`
//! operator. Shapes are immutable value types with structural equality.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IrError;

/// Element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Float,
    Double,
    Int32,
    Int64,
    Uint8,
    Bool,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Float => 4,
            ElementType::Double => 8,
            ElementType::Int32 => 4,
            ElementType::Int64 => 8,
            ElementType::Uint8 => 1,
            ElementType::Bool => 1,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ElementType::Int32 | ElementType::Int64 | ElementType::Uint8
        )
    }

    /// Parse an element type name as used by model front-ends.
    pub fn from_name(name: &str) -> Result<Self, IrError> {
        match name {
            "float" => Ok(ElementType::Float),
            "double" => Ok(ElementType::Double),
            "int32" => Ok(ElementType::Int32),
            "int64" => Ok(ElementType::Int64),
            "uint8" => Ok(ElementType::Uint8),
            "bool" => Ok(ElementType::Bool),
            _ => Err(IrError::InvalidShape {
                reason: format!("unknown element type '{}'", name),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Float => "float",
            ElementType::Double => "double",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Uint8 => "uint8",
            ElementType::Bool => "bool",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a single tensor: element type, dimension lengths and strides.
///
/// A stride of zero encodes a broadcast dimension: every index along that
/// dimension addresses the same element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    element_type: ElementType,
    lens: Vec<usize>,
    strides: Vec<usize>,
}

impl TensorShape {
    /// Create a shape with row-major contiguous strides.
    pub fn new(element_type: ElementType, lens: Vec<usize>) -> Result<Self, IrError> {
        let strides = standard_strides(&lens);
        Self::with_strides(element_type, lens, strides)
    }

    /// Create a shape with explicit strides.
    pub fn with_strides(
        element_type: ElementType,
        lens: Vec<usize>,
        strides: Vec<usize>,
    ) -> Result<Self, IrError> {
        if lens.is_empty() {
            return Err(IrError::InvalidShape {
                reason: "dimension lengths must not be empty".into(),
            });
        }
        if let Some(pos) = lens.iter().position(|&l| l == 0) {
            return Err(IrError::InvalidShape {
                reason: format!("dimension {} has length 0", pos),
            });
        }
        if strides.len() != lens.len() {
            return Err(IrError::InvalidShape {
                reason: format!(
                    "{} strides given for {} dimensions",
                    strides.len(),
                    lens.len()
                ),
            });
        }
        Ok(TensorShape {
            element_type,
            lens,
            strides,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.lens.len()
    }

    /// Number of logical elements (product of lengths).
    pub fn elements(&self) -> usize {
        self.lens.iter().product()
    }

    /// Number of addressable buffer slots: one past the largest offset
    /// reachable through the strides.
    pub fn element_space(&self) -> usize {
        1 + self
            .lens
            .iter()
            .zip(&self.strides)
            .map(|(&l, &s)| (l - 1) * s)
            .sum::<usize>()
    }

    /// Buffer size in bytes backing this shape.
    pub fn bytes(&self) -> usize {
        self.element_space() * self.element_type.size()
    }

    /// True when strides are exactly row-major contiguous.
    pub fn standard(&self) -> bool {
        self.strides == standard_strides(&self.lens)
    }

    /// True when every element occupies a distinct slot with no padding.
    pub fn packed(&self) -> bool {
        self.element_space() == self.elements()
    }

    /// True when some dimension is broadcast (stride zero).
    pub fn broadcasted(&self) -> bool {
        self.strides.iter().any(|&s| s == 0)
    }

    /// True when this is a dimension-permuted view of a standard layout.
    pub fn transposed(&self) -> bool {
        if self.standard() {
            return false;
        }
        let mut dims: Vec<(usize, usize)> = self
            .strides
            .iter()
            .copied()
            .zip(self.lens.iter().copied())
            .collect();
        dims.sort_by(|a, b| b.0.cmp(&a.0));
        let sorted_lens: Vec<usize> = dims.iter().map(|d| d.1).collect();
        let sorted_strides: Vec<usize> = dims.iter().map(|d| d.0).collect();
        sorted_strides == standard_strides(&sorted_lens)
    }

    /// Buffer offset (in elements) of the given multi-index.
    pub fn index_of(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.lens.len());
        coords
            .iter()
            .zip(&self.strides)
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Buffer offset (in elements) of a logical row-major element position.
    pub fn linear_offset(&self, linear: usize) -> usize {
        let mut rem = linear;
        let mut offset = 0usize;
        for (i, &len) in self.lens.iter().enumerate().rev() {
            offset += (rem % len) * self.strides[i];
            rem /= len;
        }
        offset
    }

    /// The standard-layout shape over the same element type and lengths.
    pub fn as_standard(&self) -> TensorShape {
        TensorShape {
            element_type: self.element_type,
            lens: self.lens.clone(),
            strides: standard_strides(&self.lens),
        }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .lens
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("x");
        write!(f, "{}[{}]", self.element_type, dims)?;
        if !self.standard() {
            let strides = self
                .strides
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "{{{}}}", strides)?;
        }
        Ok(())
    }
}

/// A tensor shape or a fixed-arity tuple of shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Tensor(TensorShape),
    Tuple(Vec<Shape>),
}

impl Shape {
    /// Tensor shape with row-major contiguous strides.
    pub fn tensor(element_type: ElementType, lens: Vec<usize>) -> Result<Self, IrError> {
        Ok(Shape::Tensor(TensorShape::new(element_type, lens)?))
    }

    /// Tensor shape with explicit strides.
    pub fn with_strides(
        element_type: ElementType,
        lens: Vec<usize>,
        strides: Vec<usize>,
    ) -> Result<Self, IrError> {
        Ok(Shape::Tensor(TensorShape::with_strides(
            element_type,
            lens,
            strides,
        )?))
    }

    /// Single-element tensor shape.
    pub fn scalar(element_type: ElementType) -> Self {
        Shape::Tensor(TensorShape {
            element_type,
            lens: vec![1],
            strides: vec![1],
        })
    }

    pub fn tuple(components: Vec<Shape>) -> Self {
        Shape::Tuple(components)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Shape::Tuple(_))
    }

    pub fn as_tensor(&self) -> Option<&TensorShape> {
        match self {
            Shape::Tensor(t) => Some(t),
            Shape::Tuple(_) => None,
        }
    }

    pub fn expect_tensor(&self) -> Result<&TensorShape, IrError> {
        self.as_tensor().ok_or_else(|| IrError::NotATensor {
            found: self.to_string(),
        })
    }

    pub fn components(&self) -> Option<&[Shape]> {
        match self {
            Shape::Tuple(c) => Some(c),
            Shape::Tensor(_) => None,
        }
    }

    pub fn expect_tuple(&self) -> Result<&[Shape], IrError> {
        self.components().ok_or_else(|| IrError::NotATuple {
            found: self.to_string(),
        })
    }

    /// Total byte size, summing tuple components.
    pub fn bytes(&self) -> usize {
        match self {
            Shape::Tensor(t) => t.bytes(),
            Shape::Tuple(c) => c.iter().map(Shape::bytes).sum(),
        }
    }
}

impl From<TensorShape> for Shape {
    fn from(value: TensorShape) -> Self {
        Shape::Tensor(value)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Tensor(t) => t.fmt(f),
            Shape::Tuple(c) => {
                f.write_str("(")?;
                for (i, s) in c.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    s.fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Row-major contiguous strides for the given lengths.
pub fn standard_strides(lens: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; lens.len()];
    let mut acc = 1usize;
    for (i, &len) in lens.iter().enumerate().rev() {
        strides[i] = acc;
        acc *= len;
    }
    strides
}
