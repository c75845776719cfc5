//! Unit tests for targets and kernels.

use tensorgraph_ir::{Argument, ElementType, Operator, Shape};

use crate::{CompileError, RefTarget, Target, TargetRegistry};

fn f32_shape(lens: Vec<usize>) -> Shape {
    Shape::tensor(ElementType::Float, lens).unwrap()
}

#[test]
fn test_ref_add_kernel() {
    let target = RefTarget::new();
    let shape = f32_shape(vec![2, 2]);
    let kernel = target
        .kernel(&Operator::Add, &[shape.clone(), shape.clone()])
        .unwrap();

    let a = Argument::from_slice(shape.clone(), &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
    let b = Argument::from_slice(shape.clone(), &[10.0f32, 20.0, 30.0, 40.0]).unwrap();
    let out = kernel(&[a, b]).unwrap();
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![11.0, 22.0, 33.0, 44.0]);
    assert!(out.shape().as_tensor().unwrap().standard());
}

#[test]
fn test_ref_division_by_zero_faults() {
    let target = RefTarget::new();
    let shape = Shape::tensor(ElementType::Int32, vec![2]).unwrap();
    let kernel = target
        .kernel(&Operator::Div, &[shape.clone(), shape.clone()])
        .unwrap();

    let a = Argument::from_slice(shape.clone(), &[6i32, 9]).unwrap();
    let b = Argument::from_slice(shape.clone(), &[3i32, 0]).unwrap();
    assert!(kernel(&[a, b]).is_err());
}

#[test]
fn test_ref_refuses_bool_arithmetic() {
    let target = RefTarget::new();
    let shape = Shape::tensor(ElementType::Bool, vec![2]).unwrap();
    assert!(target
        .kernel(&Operator::Add, &[shape.clone(), shape.clone()])
        .is_none());
    assert!(target.kernel(&Operator::Neg, &[shape.clone()]).is_none());
    // Identity and contiguous stay available for bool data.
    assert!(target.kernel(&Operator::Identity, &[shape.clone()]).is_some());
    assert!(target.kernel(&Operator::Contiguous, &[shape]).is_some());
}

#[test]
fn test_ref_contiguous_materializes_transposed_view() {
    let target = RefTarget::new();
    let view = Shape::with_strides(ElementType::Float, vec![2, 2], vec![1, 2]).unwrap();
    let kernel = target.kernel(&Operator::Contiguous, &[view.clone()]).unwrap();

    // Buffer laid out column-major relative to the logical [2, 2] view.
    let input = Argument::from_slice(view, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
    let out = kernel(&[input]).unwrap();
    assert!(out.shape().as_tensor().unwrap().standard());
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![1.0, 3.0, 2.0, 4.0]);
}

#[test]
fn test_ref_broadcast_view() {
    let target = RefTarget::new();
    let row = f32_shape(vec![3]);
    let op = Operator::Broadcast {
        axis: 1,
        out_lens: vec![2, 3],
    };
    let kernel = target.kernel(&op, &[row.clone()]).unwrap();

    let input = Argument::from_slice(row, &[1.0f32, 2.0, 3.0]).unwrap();
    let out = kernel(&[input]).unwrap();
    let shape = out.shape().as_tensor().unwrap();
    assert!(shape.broadcasted());
    assert_eq!(shape.lens(), &[2, 3]);
    assert_eq!(
        out.to_vec::<f32>().unwrap(),
        vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
    );
}

#[test]
fn test_ref_relu() {
    let target = RefTarget::new();
    let shape = f32_shape(vec![4]);
    let kernel = target.kernel(&Operator::Relu, &[shape.clone()]).unwrap();
    let input = Argument::from_slice(shape, &[-1.0f32, 0.0, 2.5, -0.5]).unwrap();
    let out = kernel(&[input]).unwrap();
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![0.0, 0.0, 2.5, 0.0]);
}

#[test]
fn test_target_registry() {
    let registry = TargetRegistry::with_builtins();
    assert!(registry.contains("ref"));
    assert_eq!(registry.get("ref").unwrap().name(), "ref");
    assert!(matches!(
        registry.get("gpu"),
        Err(CompileError::UnknownTarget { .. })
    ));

    let mut registry = TargetRegistry::with_builtins();
    assert!(matches!(
        registry.register(std::sync::Arc::new(RefTarget::new())),
        Err(CompileError::DuplicateTarget { .. })
    ));
}
