//! Flat, shape-tagged numeric buffers exchanged with the inference engine

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Shape dimensions overflow when multiplied")]
    ShapeOverflow,

    #[error("Shape mismatch: expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Row-major tensor; the element type is carried by `T`.
#[derive(Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data can be millions of elements
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("len", &self.data.len())
            .field("dtype", &std::any::type_name::<T>())
            .finish()
    }
}

fn element_count(shape: &[usize]) -> Result<usize, TensorError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(TensorError::ShapeOverflow)
}

impl<T> Tensor<T> {
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self, TensorError> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<T>) {
        (self.shape, self.data)
    }
}

impl<T: Default + Clone> Tensor<T> {
    pub fn zeros(shape: Vec<usize>) -> Result<Self, TensorError> {
        let len = element_count(&shape)?;
        Ok(Self {
            shape,
            data: vec![T::default(); len],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(Tensor::new(vec![1, 2, 3], vec![0.0f32; 6]).is_ok());
        assert_eq!(
            Tensor::new(vec![2, 2], vec![0.0f32; 3]).unwrap_err(),
            TensorError::ShapeMismatch { expected: 4, got: 3 }
        );
    }

    #[test]
    fn test_new_detects_overflow() {
        let err = Tensor::<f32>::new(vec![usize::MAX, 2], vec![]).unwrap_err();
        assert_eq!(err, TensorError::ShapeOverflow);
    }

    #[test]
    fn test_zeros() {
        let t = Tensor::<f32>::zeros(vec![1, 3, 2, 2]).unwrap();
        assert_eq!(t.len(), 12);
        assert_eq!(t.ndim(), 4);
        assert!(t.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_debug_does_not_dump_data() {
        let t = Tensor::<f32>::zeros(vec![1, 3, 64, 64]).unwrap();
        let dbg = format!("{:?}", t);
        assert!(dbg.contains("12288"));
        assert!(dbg.len() < 200);
    }
}
