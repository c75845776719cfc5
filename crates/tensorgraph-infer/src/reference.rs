//! Reference CPU target.
//!
//! Interpreter-grade kernels for the built-in operator set, used as the
//! correctness baseline for other backends. Kernels read inputs through
//! their shapes' strides (including zero-stride broadcast dimensions) and
//! produce standard-layout outputs, except for the explicit view operators
//! (`broadcast`, `transpose`) which re-shape the buffer.

use std::sync::Arc;

use tensorgraph_compiler::{AutoContiguous, Pass};
use tensorgraph_ir::{Argument, Element, ElementType, OpRegistry, Operator, Shape};

use crate::error::KernelError;
use crate::target::{Kernel, Target};

/// The reference backend, registered as `"ref"`.
pub struct RefTarget {
    registry: OpRegistry,
}

impl RefTarget {
    pub fn new() -> Self {
        RefTarget {
            registry: OpRegistry::with_builtins(),
        }
    }
}

impl Default for RefTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl Target for RefTarget {
    fn name(&self) -> &str {
        "ref"
    }

    fn passes(&self) -> Vec<Box<dyn Pass>> {
        // Kernels accept arbitrary strides, but normalized layouts keep the
        // executed graph and its outputs row-major.
        vec![Box::new(AutoContiguous)]
    }

    fn kernel(&self, op: &Operator, inputs: &[Shape]) -> Option<Kernel> {
        let out = self.registry.infer_shape(op, inputs, &[]).ok()?;
        match op {
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Min
            | Operator::Max => {
                let ty = inputs.first()?.as_tensor()?.element_type();
                binary_for(ty, op.clone(), out)
            }
            Operator::Neg | Operator::Abs => {
                let ty = inputs.first()?.as_tensor()?.element_type();
                match ty {
                    ElementType::Float
                    | ElementType::Double
                    | ElementType::Int32
                    | ElementType::Int64 => unary_for(ty, op.clone(), out),
                    ElementType::Uint8 | ElementType::Bool => None,
                }
            }
            Operator::Relu => {
                let ty = inputs.first()?.as_tensor()?.element_type();
                match ty {
                    ElementType::Bool => None,
                    _ => unary_for(ty, op.clone(), out),
                }
            }
            Operator::Identity => Some(Arc::new(|args| Ok(args[0].clone()))),
            Operator::Contiguous => Some(contiguous_kernel(out)),
            Operator::Broadcast { .. } | Operator::Transpose { .. } => Some(view_kernel(out)),
            Operator::Literal { .. }
            | Operator::If
            | Operator::GetTupleElem { .. }
            | Operator::Extension { .. } => None,
        }
    }
}

/// Element operations the reference kernels need beyond the `Element` view
/// trait. Integer arithmetic wraps; division by zero is a kernel fault.
trait RefElement: Element + PartialOrd {
    fn zero() -> Self;
    fn add(a: Self, b: Self) -> Self;
    fn sub(a: Self, b: Self) -> Self;
    fn mul(a: Self, b: Self) -> Self;
    fn div(a: Self, b: Self) -> Result<Self, KernelError>;
    fn neg(a: Self) -> Self;
    fn abs(a: Self) -> Self;
}

macro_rules! impl_ref_element_float {
    ($ty:ty) => {
        impl RefElement for $ty {
            fn zero() -> Self {
                0.0
            }
            fn add(a: Self, b: Self) -> Self {
                a + b
            }
            fn sub(a: Self, b: Self) -> Self {
                a - b
            }
            fn mul(a: Self, b: Self) -> Self {
                a * b
            }
            fn div(a: Self, b: Self) -> Result<Self, KernelError> {
                Ok(a / b)
            }
            fn neg(a: Self) -> Self {
                -a
            }
            fn abs(a: Self) -> Self {
                a.abs()
            }
        }
    };
}

macro_rules! impl_ref_element_int {
    ($ty:ty) => {
        impl RefElement for $ty {
            fn zero() -> Self {
                0
            }
            fn add(a: Self, b: Self) -> Self {
                a.wrapping_add(b)
            }
            fn sub(a: Self, b: Self) -> Self {
                a.wrapping_sub(b)
            }
            fn mul(a: Self, b: Self) -> Self {
                a.wrapping_mul(b)
            }
            fn div(a: Self, b: Self) -> Result<Self, KernelError> {
                if b == 0 {
                    return Err(KernelError("integer division by zero".into()));
                }
                Ok(a.wrapping_div(b))
            }
            fn neg(a: Self) -> Self {
                a.wrapping_neg()
            }
            fn abs(a: Self) -> Self {
                a.wrapping_abs()
            }
        }
    };
}

impl_ref_element_float!(f32);
impl_ref_element_float!(f64);
impl_ref_element_int!(i32);
impl_ref_element_int!(i64);

impl RefElement for u8 {
    fn zero() -> Self {
        0
    }
    fn add(a: Self, b: Self) -> Self {
        a.wrapping_add(b)
    }
    fn sub(a: Self, b: Self) -> Self {
        a.wrapping_sub(b)
    }
    fn mul(a: Self, b: Self) -> Self {
        a.wrapping_mul(b)
    }
    fn div(a: Self, b: Self) -> Result<Self, KernelError> {
        if b == 0 {
            return Err(KernelError("integer division by zero".into()));
        }
        Ok(a / b)
    }
    fn neg(a: Self) -> Self {
        a.wrapping_neg()
    }
    fn abs(a: Self) -> Self {
        a
    }
}

fn binary_for(ty: ElementType, op: Operator, out: Shape) -> Option<Kernel> {
    match ty {
        ElementType::Float => Some(make_binary::<f32>(op, out)),
        ElementType::Double => Some(make_binary::<f64>(op, out)),
        ElementType::Int32 => Some(make_binary::<i32>(op, out)),
        ElementType::Int64 => Some(make_binary::<i64>(op, out)),
        ElementType::Uint8 => Some(make_binary::<u8>(op, out)),
        ElementType::Bool => None,
    }
}

fn unary_for(ty: ElementType, op: Operator, out: Shape) -> Option<Kernel> {
    match ty {
        ElementType::Float => Some(make_unary::<f32>(op, out)),
        ElementType::Double => Some(make_unary::<f64>(op, out)),
        ElementType::Int32 => Some(make_unary::<i32>(op, out)),
        ElementType::Int64 => Some(make_unary::<i64>(op, out)),
        ElementType::Uint8 => Some(make_unary::<u8>(op, out)),
        ElementType::Bool => None,
    }
}

fn make_binary<T: RefElement>(op: Operator, out: Shape) -> Kernel {
    Arc::new(move |args: &[Argument]| {
        let a = args[0].to_vec::<T>().map_err(ir_fault)?;
        let b = args[1].to_vec::<T>().map_err(ir_fault)?;
        let mut values = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b.iter()) {
            values.push(match op {
                Operator::Add => T::add(x, y),
                Operator::Sub => T::sub(x, y),
                Operator::Mul => T::mul(x, y),
                Operator::Div => T::div(x, y)?,
                Operator::Min => {
                    if y < x {
                        y
                    } else {
                        x
                    }
                }
                Operator::Max => {
                    if x < y {
                        y
                    } else {
                        x
                    }
                }
                _ => return Err(KernelError(format!("'{}' is not a binary operator", op))),
            });
        }
        Argument::from_slice(out.clone(), &values).map_err(ir_fault)
    })
}

fn make_unary<T: RefElement>(op: Operator, out: Shape) -> Kernel {
    Arc::new(move |args: &[Argument]| {
        let a = args[0].to_vec::<T>().map_err(ir_fault)?;
        let mut values = Vec::with_capacity(a.len());
        for &x in &a {
            values.push(match op {
                Operator::Neg => T::neg(x),
                Operator::Abs => T::abs(x),
                Operator::Relu => {
                    if x < T::zero() {
                        T::zero()
                    } else {
                        x
                    }
                }
                _ => return Err(KernelError(format!("'{}' is not a unary operator", op))),
            });
        }
        Argument::from_slice(out.clone(), &values).map_err(ir_fault)
    })
}

/// Materialize the logical elements into a fresh row-major buffer.
fn contiguous_kernel(out: Shape) -> Kernel {
    Arc::new(move |args: &[Argument]| {
        let shape = args[0]
            .shape()
            .as_tensor()
            .ok_or_else(|| KernelError("contiguous expects a tensor input".into()))?;
        let src = args[0].data().expect("tensor argument carries bytes");
        let size = shape.element_type().size();
        let mut dst = vec![0u8; shape.elements() * size];
        for linear in 0..shape.elements() {
            let from = shape.linear_offset(linear) * size;
            dst[linear * size..(linear + 1) * size].copy_from_slice(&src[from..from + size]);
        }
        Argument::from_bytes(out.clone(), dst).map_err(ir_fault)
    })
}

/// Reinterpret the input buffer under the precomputed output shape
/// (broadcast strides or permuted dimensions); bytes are shared unchanged.
fn view_kernel(out: Shape) -> Kernel {
    Arc::new(move |args: &[Argument]| {
        let data = args[0]
            .data()
            .ok_or_else(|| KernelError("view operators expect a tensor input".into()))?;
        Argument::from_bytes(out.clone(), data.to_vec()).map_err(ir_fault)
    })
}

fn ir_fault(err: tensorgraph_ir::IrError) -> KernelError {
    KernelError(err.to_string())
}
